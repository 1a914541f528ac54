//! Moderator operations reachable over REST.
//!
//! Every action goes through the same engine entry point as the WebSocket
//! moderator, acting as [`Caller::Console`].

use tracing::info;

use crate::{
    dao::question_bank::QuestionKind,
    dto::{
        admin::{
            ActionResponse, CustomTextRequest, DispatchQuestionRequest, JudgeCorrectRequest,
            OpenBuzzerRequest, PointsRequest, QuestionsQuery, QuestionsResponse, RevealRequest,
        },
        events::StateSnapshot,
        ws::{ClientMessage, Permission},
    },
    error::ServiceError,
    state::{SharedState, engine::Caller},
};

/// Full moderator snapshot, secrets included.
pub async fn snapshot(state: &SharedState) -> StateSnapshot {
    state.engine().await.snapshot(true)
}

/// List one section of the question bank.
pub fn list_questions(
    state: &SharedState,
    query: QuestionsQuery,
) -> Result<QuestionsResponse, ServiceError> {
    let bank = state.bank();
    let categories = bank.categories();
    let key = query.key.map(|key| key.trim().to_string());

    if query.kind == QuestionKind::Category {
        let Some(name) = key.as_deref() else {
            return Err(ServiceError::InvalidInput(
                "`key` is required to list a category".into(),
            ));
        };
        if !categories.iter().any(|category| category == name) {
            return Err(ServiceError::NotFound(format!("category `{name}` not found")));
        }
    }

    Ok(QuestionsResponse {
        kind: query.kind,
        questions: bank.list(query.kind, key.as_deref()),
        key,
        categories,
    })
}

/// Apply an arbitrary moderator action given in the WebSocket format.
pub async fn perform(
    state: &SharedState,
    message: ClientMessage,
) -> Result<ActionResponse, ServiceError> {
    if message.permission() != Permission::Moderator {
        return Err(ServiceError::InvalidInput(format!(
            "`{}` is not a moderator action",
            message.name()
        )));
    }
    Ok(apply(state, message).await)
}

/// Put a question in play.
pub async fn dispatch_question(
    state: &SharedState,
    request: DispatchQuestionRequest,
) -> ActionResponse {
    apply(
        state,
        ClientMessage::DispatchQuestion {
            question: request.question,
        },
    )
    .await
}

/// Open the buzzer window.
pub async fn open_buzzer(state: &SharedState, request: OpenBuzzerRequest) -> ActionResponse {
    apply(
        state,
        ClientMessage::OpenBuzzer {
            standalone: request.standalone,
        },
    )
    .await
}

/// Stop accepting buzzes.
pub async fn close_buzzer(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::CloseBuzzer).await
}

/// Empty the queue and reopen the window.
pub async fn reset_buzzer(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::ResetBuzzer).await
}

/// The team at the head of the queue answered wrong.
pub async fn judge_wrong(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::JudgeWrong).await
}

/// The team at the head of the queue answered right.
pub async fn judge_correct(state: &SharedState, request: JudgeCorrectRequest) -> ActionResponse {
    apply(
        state,
        ClientMessage::JudgeCorrect {
            points: request.points,
        },
    )
    .await
}

/// Credit a team, either for the current question or as a plain correction.
pub async fn team_points(
    state: &SharedState,
    team_id: String,
    request: PointsRequest,
) -> ActionResponse {
    let message = if request.award {
        ClientMessage::AwardPoints {
            team_id,
            points: request.points,
        }
    } else {
        ClientMessage::AssignPoints {
            team_id,
            delta: request.points,
        }
    };
    apply(state, message).await
}

/// Return every screen to its idle state.
pub async fn reset_displays(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::ResetDisplays).await
}

/// Pause the show.
pub async fn pause(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::Pause).await
}

/// Resume the show.
pub async fn resume(state: &SharedState) -> ActionResponse {
    apply(state, ClientMessage::Resume).await
}

/// Store the custom screen text.
pub async fn save_custom_text(state: &SharedState, request: CustomTextRequest) -> ActionResponse {
    apply(state, ClientMessage::SaveCustomText { text: request.text }).await
}

/// Judge the submitted answers and credit the correct ones.
pub async fn reveal_answers(state: &SharedState, request: RevealRequest) -> ActionResponse {
    apply(
        state,
        ClientMessage::RevealAnswers {
            points: request.points,
        },
    )
    .await
}

async fn apply(state: &SharedState, message: ClientMessage) -> ActionResponse {
    let action = message.name();
    let applied = state.apply(Caller::Console, message).await;
    info!(action, applied, "console action");
    ActionResponse { applied }
}
