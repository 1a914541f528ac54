use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// Reasons the engine refuses a client action.
///
/// A rejection never reaches the acting client: it is logged and the action is
/// dropped without touching the game state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The connection has not declared its role yet.
    #[error("connection is not registered")]
    NotRegistered,
    /// Preview connections observe the game but cannot act on it.
    #[error("preview connections are read-only")]
    ReadOnly,
    /// The caller's role may not perform the action, or a precondition failed.
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// The action references a team, question or entry that does not exist.
    #[error("missing target: {0}")]
    MissingTarget(String),
}

impl Rejection {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Rejection::InvalidAction(reason.into())
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Rejection::MissingTarget(what.into())
    }
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
