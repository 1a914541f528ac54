//! DTO definitions used by the moderator REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    dao::question_bank::QuestionKind,
    dto::validation::validate_not_blank,
    state::game::Question,
};

/// Result of a moderator action: silent rejections answer `applied: false`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub applied: bool,
}

/// Query of the question bank listing.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct QuestionsQuery {
    /// Bank section.
    pub kind: QuestionKind,
    /// Category name when `kind` is `category`.
    #[serde(default)]
    pub key: Option<String>,
}

/// Questions of one bank section.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionsResponse {
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub categories: Vec<String>,
    pub questions: Vec<Question>,
}

/// Question to put in play.
///
/// The question is accepted verbatim once its prompt is sane.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DispatchQuestionRequest {
    #[validate(custom(function = "validate_question"))]
    pub question: Question,
}

fn validate_question(question: &Question) -> Result<(), ValidationError> {
    validate_not_blank(&question.prompt)?;
    if question.prompt.chars().count() > 500 {
        return Err(ValidationError::new("prompt_too_long"));
    }
    Ok(())
}

/// Open the buzzer window.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct OpenBuzzerRequest {
    #[serde(default)]
    pub standalone: bool,
}

/// Points for the head of the queue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JudgeCorrectRequest {
    #[validate(range(min = -100_000, max = 100_000))]
    pub points: i32,
}

/// Points awarded to a team, directly or as a manual correction.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PointsRequest {
    #[validate(range(min = -100_000, max = 100_000))]
    pub points: i32,
    /// `true` records a correct answer for the current question; `false` is a
    /// plain score correction.
    #[serde(default)]
    pub award: bool,
}

/// Text for the custom screen; empty restores the default.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CustomTextRequest {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub text: Option<String>,
}

/// Points credited per correct answer when revealing.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct RevealRequest {
    #[serde(default)]
    #[validate(range(min = -100_000, max = 100_000))]
    pub points: Option<i32>,
}
