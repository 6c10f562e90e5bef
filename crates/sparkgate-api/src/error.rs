//! Error types for the gateway

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use sparkgate_common::ErrorResponse;
use sparkgate_submission::SubmissionError;

/// Challenge sent with every 401
pub const BASIC_AUTH_CHALLENGE: &str = "Basic realm=\"Authorization Required\"";

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed body or query string
    #[error("{0}")]
    BadRequest(String),

    /// Missing or rejected credentials
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Failure from the submission layer
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    /// Object storage upload failed
    #[error("upload failed: {0}")]
    Upload(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Submission(e) => match e {
                SubmissionError::Conflict { .. } | SubmissionError::Validation { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SubmissionError::NotFound { .. } => StatusCode::NOT_FOUND,
                SubmissionError::Orchestrator(_)
                | SubmissionError::Rejected { .. }
                | SubmissionError::TeardownTimeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Upload(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            message: self.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_AUTH_CHALLENGE),
            );
        }
        response
    }
}
