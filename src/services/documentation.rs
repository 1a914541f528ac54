use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz show backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::public::get_state,
        crate::routes::public::get_teams,
        crate::routes::public::get_current_question,
        crate::routes::admin::get_state,
        crate::routes::admin::list_questions,
        crate::routes::admin::perform_action,
        crate::routes::admin::dispatch_question,
        crate::routes::admin::open_buzzer,
        crate::routes::admin::close_buzzer,
        crate::routes::admin::reset_buzzer,
        crate::routes::admin::judge_wrong,
        crate::routes::admin::judge_correct,
        crate::routes::admin::team_points,
        crate::routes::admin::reset_displays,
        crate::routes::admin::pause,
        crate::routes::admin::resume,
        crate::routes::admin::save_custom_text,
        crate::routes::admin::reveal_answers,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::events::StateSnapshot,
            crate::dto::events::TeamsEvent,
            crate::dto::events::BuzzerQueueEvent,
            crate::dto::events::BuzzerArmedEvent,
            crate::dto::events::BuzzerPositionEvent,
            crate::dto::events::QuestionEvent,
            crate::dto::events::ModeratorQuestionEvent,
            crate::dto::events::QuestionListEvent,
            crate::dto::events::RevealEvent,
            crate::dto::events::RoundAnswersEvent,
            crate::dto::events::AnswerReceivedEvent,
            crate::dto::events::ViewEvent,
            crate::dto::events::ModeEvent,
            crate::dto::events::RegisteredEvent,
            crate::dto::public::TeamsResponse,
            crate::dto::public::CurrentQuestionResponse,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::QuestionsResponse,
            crate::state::game::Question,
            crate::state::registry::Role,
            crate::dao::question_bank::QuestionKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "ws", description = "WebSocket session shared by teams, moderators and displays"),
        (name = "public", description = "Read-only projections for displays"),
        (name = "admin", description = "Moderator controls"),
    )
)]
pub struct ApiDoc;
