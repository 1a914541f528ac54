//! Live connections and the role each one declared.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::Rejection,
    state::game::{DEFAULT_TEAM_NAME_PREFIX, Team, TeamId},
};

/// Identifier assigned to every socket when it connects.
pub type ConnectionId = Uuid;

/// Longest team name kept; extra characters are dropped.
const MAX_TEAM_NAME_CHARS: usize = 40;

/// Role a client declares on first contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buzzer device of a playing team.
    Team,
    /// Operator console.
    #[serde(alias = "admin")]
    Moderator,
    /// Public screen.
    Display,
    /// Read-only mirror of the team UI.
    Preview,
}

/// What a registered connection is allowed to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientHandle {
    /// A team device; preview devices observe only.
    Team {
        /// Roster entry this connection speaks for.
        team_id: TeamId,
        /// Read-only observer.
        preview: bool,
    },
    /// Moderator console.
    Moderator,
    /// Public display.
    Display,
}

impl ClientHandle {
    /// Role matching this handle.
    pub fn role(&self) -> Role {
        match self {
            ClientHandle::Team { preview: true, .. } => Role::Preview,
            ClientHandle::Team { .. } => Role::Team,
            ClientHandle::Moderator => Role::Moderator,
            ClientHandle::Display => Role::Display,
        }
    }

    /// Team this connection speaks for.
    pub fn team_id(&self) -> Option<&TeamId> {
        match self {
            ClientHandle::Team { team_id, .. } => Some(team_id),
            _ => None,
        }
    }
}

/// Mapping from live connection to its declared role.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ClientHandle>,
}

impl ConnectionRegistry {
    /// Registered handle of `connection_id`.
    pub fn handle(&self, connection_id: &ConnectionId) -> Option<&ClientHandle> {
        self.connections.get(connection_id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Bind `connection_id` to `role`, creating or re-attaching its team in
    /// `roster` when the role is team-like.
    ///
    /// A connection keeps its first role for its whole lifetime. Teams that
    /// pass the `team_key` of an existing roster entry resume it with its score.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        role: Role,
        display_name: Option<&str>,
        team_key: Option<&str>,
        roster: &mut IndexMap<TeamId, Team>,
    ) -> Result<ClientHandle, Rejection> {
        if self.connections.contains_key(&connection_id) {
            return Err(Rejection::invalid("connection already registered"));
        }

        let name = display_name.and_then(sanitize_name);
        let handle = match role {
            Role::Moderator => ClientHandle::Moderator,
            Role::Display => ClientHandle::Display,
            Role::Preview => {
                let team_id = connection_id.to_string();
                let name = name.unwrap_or_else(|| "Preview".to_string());
                roster.insert(team_id.clone(), Team::new(team_id.clone(), name, true));
                ClientHandle::Team {
                    team_id,
                    preview: true,
                }
            }
            Role::Team => {
                let team_id = team_key
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| connection_id.to_string());

                match roster.get_mut(&team_id) {
                    Some(team) if !team.is_preview => {
                        team.connected = true;
                        if let Some(name) = name {
                            team.name = name;
                        }
                        info!(team_id = %team_id, "team reconnected");
                    }
                    Some(_) => {
                        return Err(Rejection::invalid(format!(
                            "team key `{team_id}` belongs to a preview"
                        )));
                    }
                    None => {
                        let ranked = roster.values().filter(|team| !team.is_preview).count();
                        let name = name
                            .unwrap_or_else(|| format!("{DEFAULT_TEAM_NAME_PREFIX} {}", ranked + 1));
                        roster.insert(team_id.clone(), Team::new(team_id.clone(), name, false));
                    }
                }

                ClientHandle::Team {
                    team_id,
                    preview: false,
                }
            }
        };

        self.connections.insert(connection_id, handle.clone());
        Ok(handle)
    }

    /// Forget `connection_id`.
    ///
    /// A team's roster entry and score survive; the team is only flagged as
    /// disconnected once no other connection speaks for it. Preview entries
    /// hold no score and are dropped. Returns the handle that was removed.
    pub fn unregister(
        &mut self,
        connection_id: &ConnectionId,
        roster: &mut IndexMap<TeamId, Team>,
    ) -> Option<ClientHandle> {
        let handle = self.connections.remove(connection_id)?;

        if let ClientHandle::Team { team_id, preview } = &handle {
            if *preview {
                roster.shift_remove(team_id);
            } else if !self.is_team_attached(team_id) {
                if let Some(team) = roster.get_mut(team_id) {
                    team.connected = false;
                }
            }
        }

        Some(handle)
    }

    /// Whether any live connection speaks for `team_id`.
    pub fn is_team_attached(&self, team_id: &str) -> bool {
        self.connections
            .values()
            .any(|handle| handle.team_id().is_some_and(|id| id == team_id))
    }
}

fn sanitize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TEAM_NAME_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ConnectionRegistry, IndexMap<TeamId, Team>) {
        (ConnectionRegistry::default(), IndexMap::new())
    }

    #[test]
    fn team_without_key_uses_connection_id() {
        let (mut registry, mut roster) = setup();
        let conn = Uuid::new_v4();
        let handle = registry
            .register(conn, Role::Team, Some("  Owls "), None, &mut roster)
            .unwrap();

        let team_id = conn.to_string();
        assert_eq!(
            handle,
            ClientHandle::Team {
                team_id: team_id.clone(),
                preview: false
            }
        );
        assert_eq!(roster[&team_id].name, "Owls");
    }

    #[test]
    fn role_is_fixed_for_the_connection_lifetime() {
        let (mut registry, mut roster) = setup();
        let conn = Uuid::new_v4();
        registry
            .register(conn, Role::Display, None, None, &mut roster)
            .unwrap();
        assert!(
            registry
                .register(conn, Role::Moderator, None, None, &mut roster)
                .is_err()
        );
        assert_eq!(registry.handle(&conn), Some(&ClientHandle::Display));
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        let (mut registry, mut roster) = setup();
        registry
            .register(Uuid::new_v4(), Role::Team, Some("   "), Some("t1"), &mut roster)
            .unwrap();
        assert_eq!(roster["t1"].name, "Team 1");
    }

    #[test]
    fn score_survives_disconnect_and_reconnect() {
        let (mut registry, mut roster) = setup();
        let first = Uuid::new_v4();
        registry
            .register(first, Role::Team, Some("Owls"), Some("owls"), &mut roster)
            .unwrap();
        roster.get_mut("owls").unwrap().score = 300;

        registry.unregister(&first, &mut roster);
        assert!(!roster["owls"].connected);
        assert_eq!(roster["owls"].score, 300);

        let second = Uuid::new_v4();
        registry
            .register(second, Role::Team, None, Some("owls"), &mut roster)
            .unwrap();
        assert!(roster["owls"].connected);
        assert_eq!(roster["owls"].score, 300);
        assert_eq!(roster["owls"].name, "Owls");
    }

    #[test]
    fn team_stays_connected_while_another_socket_remains() {
        let (mut registry, mut roster) = setup();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        registry
            .register(first, Role::Team, None, Some("owls"), &mut roster)
            .unwrap();
        registry
            .register(second, Role::Team, None, Some("owls"), &mut roster)
            .unwrap();

        registry.unregister(&first, &mut roster);
        assert!(roster["owls"].connected);
    }

    #[test]
    fn preview_entries_are_flagged_and_dropped_on_disconnect() {
        let (mut registry, mut roster) = setup();
        let conn = Uuid::new_v4();
        let handle = registry
            .register(conn, Role::Preview, None, None, &mut roster)
            .unwrap();
        assert_eq!(handle.role(), Role::Preview);
        assert!(roster[&conn.to_string()].is_preview);

        registry.unregister(&conn, &mut roster);
        assert!(roster.is_empty());
    }
}
