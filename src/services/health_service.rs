use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with a few gauges about the show.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let connections = state.sockets().len();
    let teams = state.engine().await.state().ranked_teams().count();
    HealthResponse::ok(connections, teams)
}
