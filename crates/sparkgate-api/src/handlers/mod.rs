//! Route handlers
//!
//! Handlers only translate between the wire protocol and the submission layer.

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;

use sparkgate_common::SubmissionRequest;

use crate::error::{Error, Result};

pub mod log;
pub mod submission;
pub mod upload;

pub use log::submission_log;
pub use submission::{
    delete_submission, kill_submission, list_submissions, submission_status, submit,
    submit_with_id,
};
pub use upload::upload;

/// Server-generated submission id: `app-` followed by a dash-free UUID
pub fn generate_submission_id() -> String {
    format!("app-{}", uuid::Uuid::new_v4().simple())
}

/// Decode a submission body, reporting parse errors as bad requests
pub(crate) fn parse_submission(body: &[u8]) -> Result<SubmissionRequest> {
    serde_json::from_slice(body)
        .map_err(|e| Error::BadRequest(format!("invalid submission request: {}", e)))
}

/// Unwrap query parameters, turning rejections into `{message}` bad requests
pub(crate) fn query<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|e| Error::BadRequest(e.body_text()))
}
