use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{
        events::StateSnapshot,
        public::{CurrentQuestionResponse, TeamsResponse},
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints that expose the current show.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/state", get(get_state))
        .route("/public/teams", get(get_teams))
        .route("/public/question", get(get_current_question))
}

#[utoipa::path(
    get,
    path = "/public/state",
    tag = "public",
    responses((status = 200, description = "Display snapshot", body = StateSnapshot))
)]
/// Return the snapshot a display would receive.
pub async fn get_state(State(state): State<SharedState>) -> Json<StateSnapshot> {
    Json(public_service::snapshot(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/teams",
    tag = "public",
    responses(
        (status = 200, description = "Current standings", body = TeamsResponse),
        (status = 404, description = "Leaderboard hidden")
    )
)]
/// Return the teams ordered by score.
pub async fn get_teams(
    State(state): State<SharedState>,
) -> Result<Json<TeamsResponse>, AppError> {
    let payload = public_service::get_teams(&state).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/public/question",
    tag = "public",
    responses(
        (status = 200, description = "Current question", body = CurrentQuestionResponse),
        (status = 404, description = "No active question")
    )
)]
/// Return the question in play, without its solution.
pub async fn get_current_question(
    State(state): State<SharedState>,
) -> Result<Json<CurrentQuestionResponse>, AppError> {
    let payload = public_service::get_current_question(&state).await?;
    Ok(Json(payload))
}
