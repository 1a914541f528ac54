//! Service helpers that expose read-only public projections of the current show.

use std::time::Instant;

use crate::{
    dto::{
        events::{QuestionPayload, StateSnapshot, TeamSummary, seconds},
        public::{CurrentQuestionResponse, TeamsResponse},
    },
    error::ServiceError,
    state::SharedState,
};

/// Snapshot as a display would receive it.
pub async fn snapshot(state: &SharedState) -> StateSnapshot {
    state.engine().await.snapshot(false)
}

/// Return the teams exposed to the public UI, unless the finale hides scores.
pub async fn get_teams(state: &SharedState) -> Result<TeamsResponse, ServiceError> {
    let engine = state.engine().await;
    let game = engine.state();
    if game.modes.leaderboard_hidden() {
        return Err(ServiceError::NotFound("leaderboard is hidden".into()));
    }

    let teams = game.leaderboard().into_iter().map(TeamSummary::from).collect();
    Ok(TeamsResponse { teams })
}

/// Return the question in play, stripped of its solution.
pub async fn get_current_question(
    state: &SharedState,
) -> Result<CurrentQuestionResponse, ServiceError> {
    let engine = state.engine().await;
    let game = engine.state();
    let question = game
        .current_question
        .as_ref()
        .ok_or_else(|| ServiceError::NotFound("no active question".into()))?;

    Ok(CurrentQuestionResponse {
        question: QuestionPayload::from(question),
        elapsed_seconds: seconds(game.elapsed(Instant::now())),
    })
}
