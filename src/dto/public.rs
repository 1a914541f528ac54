use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::events::{QuestionPayload, TeamSummary};

/// Response payload listing the teams on the roster.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamsResponse {
    pub teams: Vec<TeamSummary>,
}

/// Response describing the question in play, without its solution.
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentQuestionResponse {
    pub question: QuestionPayload,
    /// Seconds since the question was dispatched.
    pub elapsed_seconds: f64,
}
