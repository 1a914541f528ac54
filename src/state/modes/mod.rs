//! Special rounds layered on top of the base round lifecycle.
//!
//! At most one special round is active. The slot holds the whole sub-state, so
//! replacing or clearing it drops every counter of the previous round and a
//! later activation always starts from initial values.

pub mod duel;
pub mod finale;
pub mod memory;
pub mod zoom;

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

pub use self::{
    duel::DuelState,
    finale::FinaleState,
    memory::{MemoryPhase, MemoryState},
    zoom::ZoomState,
};

/// Names of the special rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// Two-team head-to-head.
    Duel,
    /// Progressive image reveal.
    Zoom,
    /// Memorise, then locate.
    Memory,
    /// Bet-based final.
    Finale,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeKind::Duel => "duel",
            ModeKind::Zoom => "zoom",
            ModeKind::Memory => "memory",
            ModeKind::Finale => "finale",
        };
        f.write_str(name)
    }
}

/// The special round currently running, with its own progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveMode {
    /// Duel in progress.
    Duel(DuelState),
    /// Zoom in progress.
    Zoom(ZoomState),
    /// Memory in progress.
    Memory(MemoryState),
    /// Finale in progress.
    Finale(FinaleState),
}

impl ActiveMode {
    /// Which special round this is.
    pub fn kind(&self) -> ModeKind {
        match self {
            ActiveMode::Duel(_) => ModeKind::Duel,
            ActiveMode::Zoom(_) => ModeKind::Zoom,
            ActiveMode::Memory(_) => ModeKind::Memory,
            ActiveMode::Finale(_) => ModeKind::Finale,
        }
    }
}

/// Single slot for the active special round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeController {
    active: Option<ActiveMode>,
}

impl ModeController {
    /// Currently active round, if any.
    pub fn active(&self) -> Option<&ActiveMode> {
        self.active.as_ref()
    }

    /// Kind of the active round.
    pub fn kind(&self) -> Option<ModeKind> {
        self.active.as_ref().map(ActiveMode::kind)
    }

    /// Install `mode`, discarding whatever round was active. Returns the kind
    /// that was replaced.
    pub fn activate(&mut self, mode: ActiveMode) -> Option<ModeKind> {
        self.active.replace(mode).map(|previous| previous.kind())
    }

    /// Drop the active round of `kind`. Returns `false` when another (or no)
    /// round is active.
    pub fn deactivate(&mut self, kind: ModeKind) -> bool {
        if self.kind() == Some(kind) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Drop whatever round is active.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Active duel.
    pub fn duel_mut(&mut self) -> Option<&mut DuelState> {
        match self.active.as_mut() {
            Some(ActiveMode::Duel(state)) => Some(state),
            _ => None,
        }
    }

    /// Active zoom, read-only.
    pub fn zoom(&self) -> Option<&ZoomState> {
        match self.active.as_ref() {
            Some(ActiveMode::Zoom(state)) => Some(state),
            _ => None,
        }
    }

    /// Active zoom.
    pub fn zoom_mut(&mut self) -> Option<&mut ZoomState> {
        match self.active.as_mut() {
            Some(ActiveMode::Zoom(state)) => Some(state),
            _ => None,
        }
    }

    /// Active memory round.
    pub fn memory_mut(&mut self) -> Option<&mut MemoryState> {
        match self.active.as_mut() {
            Some(ActiveMode::Memory(state)) => Some(state),
            _ => None,
        }
    }

    /// Active finale, read-only.
    pub fn finale(&self) -> Option<&FinaleState> {
        match self.active.as_ref() {
            Some(ActiveMode::Finale(state)) => Some(state),
            _ => None,
        }
    }

    /// Active finale.
    pub fn finale_mut(&mut self) -> Option<&mut FinaleState> {
        match self.active.as_mut() {
            Some(ActiveMode::Finale(state)) => Some(state),
            _ => None,
        }
    }

    /// Whether the display must not show scores right now.
    pub fn leaderboard_hidden(&self) -> bool {
        self.finale().is_some_and(|finale| finale.hide_leaderboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activating_replaces_previous_round() {
        let mut modes = ModeController::default();
        assert_eq!(modes.activate(ActiveMode::Zoom(ZoomState::default())), None);

        let replaced = modes.activate(ActiveMode::Memory(MemoryState::new(None)));
        assert_eq!(replaced, Some(ModeKind::Zoom));
        assert_eq!(modes.kind(), Some(ModeKind::Memory));
        assert!(modes.zoom().is_none());
    }

    #[test]
    fn reactivation_starts_from_initial_values() {
        let mut modes = ModeController::default();
        modes.activate(ActiveMode::Zoom(ZoomState::default()));
        {
            let zoom = modes.zoom_mut().unwrap();
            zoom.reveal_next_level().unwrap();
            zoom.reveal_next_level().unwrap();
            zoom.record_wrong(&"a".to_string());
        }

        modes.activate(ActiveMode::Finale(FinaleState::default()));
        modes.activate(ActiveMode::Zoom(ZoomState::default()));

        assert_eq!(modes.zoom(), Some(&ZoomState::default()));
    }

    #[test]
    fn deactivate_only_touches_matching_kind() {
        let mut modes = ModeController::default();
        modes.activate(ActiveMode::Finale(FinaleState::default()));

        assert!(!modes.deactivate(ModeKind::Duel));
        assert_eq!(modes.kind(), Some(ModeKind::Finale));
        assert!(modes.deactivate(ModeKind::Finale));
        assert!(modes.active().is_none());
    }

    #[test]
    fn hidden_leaderboard_follows_finale_flag() {
        let mut modes = ModeController::default();
        assert!(!modes.leaderboard_hidden());
        modes.activate(ActiveMode::Finale(FinaleState::default()));
        modes.finale_mut().unwrap().hide_leaderboard = true;
        assert!(modes.leaderboard_hidden());
        modes.reset();
        assert!(!modes.leaderboard_hidden());
    }
}
