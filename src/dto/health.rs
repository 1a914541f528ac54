use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process serves requests.
    pub status: String,
    /// Open WebSocket connections, registered or not.
    pub connections: usize,
    /// Teams on the roster, previews excluded.
    pub teams: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(connections: usize, teams: usize) -> Self {
        Self {
            status: "ok".to_string(),
            connections,
            teams,
        }
    }
}
