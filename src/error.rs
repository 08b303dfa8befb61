//! Error taxonomy shared by the server, the generation workers and the batch jobs.
//!
//! Every variant renders to a plain message; the HTTP layer only adds a status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or unparsable setting at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request body or form.
    #[error("{0}")]
    InvalidInput(String),

    /// Requested resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A stored test case (input or expected output) is absent.
    #[error("Test case {0} missing in S3")]
    MissingTestCase(usize),

    /// External service answered with a failure (non-2xx, unreadable body, transport error).
    #[error("{service} error: {message}")]
    Upstream { service: &'static str, message: String },

    /// Object store or metadata table operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A downloaded script could not be executed or exited non-zero.
    #[error("Script error: {0}")]
    Script(String),

    /// The background queue is closed or full.
    #[error("Queue error: {0}")]
    Queue(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream { service, message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(target: "leetgen", error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Script(err.to_string())
    }
}
