use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::{
            ActionResponse, CustomTextRequest, DispatchQuestionRequest, JudgeCorrectRequest,
            OpenBuzzerRequest, PointsRequest, QuestionsQuery, QuestionsResponse, RevealRequest,
        },
        events::StateSnapshot,
        validation::validate_team_id,
        ws::ClientMessage,
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Moderator endpoints driving the show.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/state", get(get_state))
        .route("/admin/questions", get(list_questions))
        .route("/admin/action", post(perform_action))
        .route("/admin/question", post(dispatch_question))
        .route("/admin/buzzer/open", post(open_buzzer))
        .route("/admin/buzzer/close", post(close_buzzer))
        .route("/admin/buzzer/reset", post(reset_buzzer))
        .route("/admin/buzzer/wrong", post(judge_wrong))
        .route("/admin/buzzer/correct", post(judge_correct))
        .route("/admin/teams/{id}/points", post(team_points))
        .route("/admin/displays/reset", post(reset_displays))
        .route("/admin/pause", post(pause))
        .route("/admin/resume", post(resume))
        .route("/admin/custom-text", post(save_custom_text))
        .route("/admin/reveal", post(reveal_answers))
}

/// Full moderator snapshot, including the solution and hidden mode state.
#[utoipa::path(
    get,
    path = "/admin/state",
    tag = "admin",
    responses((status = 200, description = "Moderator snapshot", body = StateSnapshot))
)]
pub async fn get_state(State(state): State<SharedState>) -> Json<StateSnapshot> {
    Json(admin_service::snapshot(&state).await)
}

/// List one section of the question bank.
#[utoipa::path(
    get,
    path = "/admin/questions",
    tag = "admin",
    params(QuestionsQuery),
    responses(
        (status = 200, description = "Questions of the section", body = QuestionsResponse),
        (status = 400, description = "Category name missing"),
        (status = 404, description = "Unknown category")
    )
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<QuestionsResponse>, AppError> {
    Ok(Json(admin_service::list_questions(&state, query)?))
}

/// Apply any moderator action expressed in the WebSocket message format.
#[utoipa::path(
    post,
    path = "/admin/action",
    tag = "admin",
    request_body = ClientMessage,
    responses(
        (status = 200, description = "Whether the action was applied", body = ActionResponse),
        (status = 400, description = "Not a moderator action")
    )
)]
pub async fn perform_action(
    State(state): State<SharedState>,
    Json(message): Json<ClientMessage>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::perform(&state, message).await?))
}

/// Put a question in play.
#[utoipa::path(
    post,
    path = "/admin/question",
    tag = "admin",
    request_body = DispatchQuestionRequest,
    responses((status = 200, description = "Question dispatched", body = ActionResponse))
)]
pub async fn dispatch_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<DispatchQuestionRequest>>,
) -> Json<ActionResponse> {
    Json(admin_service::dispatch_question(&state, payload).await)
}

/// Open the buzzer window.
#[utoipa::path(
    post,
    path = "/admin/buzzer/open",
    tag = "admin",
    request_body = OpenBuzzerRequest,
    responses((status = 200, description = "Buzzer opened", body = ActionResponse))
)]
pub async fn open_buzzer(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<OpenBuzzerRequest>>,
) -> Json<ActionResponse> {
    Json(admin_service::open_buzzer(&state, payload).await)
}

/// Stop accepting buzzes.
#[utoipa::path(
    post,
    path = "/admin/buzzer/close",
    tag = "admin",
    responses((status = 200, description = "Buzzer closed", body = ActionResponse))
)]
pub async fn close_buzzer(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::close_buzzer(&state).await)
}

/// Empty the queue and reopen the window.
#[utoipa::path(
    post,
    path = "/admin/buzzer/reset",
    tag = "admin",
    responses((status = 200, description = "Buzzer reset", body = ActionResponse))
)]
pub async fn reset_buzzer(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::reset_buzzer(&state).await)
}

/// The team at the head of the queue answered wrong.
#[utoipa::path(
    post,
    path = "/admin/buzzer/wrong",
    tag = "admin",
    responses((status = 200, description = "Head of the queue judged wrong", body = ActionResponse))
)]
pub async fn judge_wrong(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::judge_wrong(&state).await)
}

/// The team at the head of the queue answered right.
#[utoipa::path(
    post,
    path = "/admin/buzzer/correct",
    tag = "admin",
    request_body = JudgeCorrectRequest,
    responses((status = 200, description = "Head of the queue judged correct", body = ActionResponse))
)]
pub async fn judge_correct(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JudgeCorrectRequest>>,
) -> Json<ActionResponse> {
    Json(admin_service::judge_correct(&state, payload).await)
}

/// Credit a team for the current question, or correct its score.
#[utoipa::path(
    post,
    path = "/admin/teams/{id}/points",
    tag = "admin",
    params(("id" = String, Path, description = "Identifier of the team to credit")),
    request_body = PointsRequest,
    responses(
        (status = 200, description = "Points applied", body = ActionResponse),
        (status = 400, description = "Invalid team identifier or points")
    )
)]
pub async fn team_points(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Valid(Json(payload)): Valid<Json<PointsRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    validate_team_id(&id).map_err(|err| AppError::BadRequest(err.to_string()))?;
    Ok(Json(admin_service::team_points(&state, id, payload).await))
}

/// Return every screen to its idle state.
#[utoipa::path(
    post,
    path = "/admin/displays/reset",
    tag = "admin",
    responses((status = 200, description = "Displays reset", body = ActionResponse))
)]
pub async fn reset_displays(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::reset_displays(&state).await)
}

/// Pause the show.
#[utoipa::path(
    post,
    path = "/admin/pause",
    tag = "admin",
    responses((status = 200, description = "Show paused", body = ActionResponse))
)]
pub async fn pause(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::pause(&state).await)
}

/// Resume the show.
#[utoipa::path(
    post,
    path = "/admin/resume",
    tag = "admin",
    responses((status = 200, description = "Show resumed", body = ActionResponse))
)]
pub async fn resume(State(state): State<SharedState>) -> Json<ActionResponse> {
    Json(admin_service::resume(&state).await)
}

/// Store the custom screen text.
#[utoipa::path(
    post,
    path = "/admin/custom-text",
    tag = "admin",
    request_body = CustomTextRequest,
    responses((status = 200, description = "Custom text saved", body = ActionResponse))
)]
pub async fn save_custom_text(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CustomTextRequest>>,
) -> Json<ActionResponse> {
    Json(admin_service::save_custom_text(&state, payload).await)
}

/// Judge the submitted answers and credit the correct ones.
#[utoipa::path(
    post,
    path = "/admin/reveal",
    tag = "admin",
    request_body = RevealRequest,
    responses((status = 200, description = "Answers revealed", body = ActionResponse))
)]
pub async fn reveal_answers(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RevealRequest>>,
) -> Json<ActionResponse> {
    Json(admin_service::reveal_answers(&state, payload).await)
}
