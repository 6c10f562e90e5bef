//! `GET /submissions/{id}/log`
//!
//! Streams a driver or executor log. Failures are reported with status 200 and
//! a `{message}` body so simple clients can print whatever comes back. The
//! upstream log stream is dropped as soon as the client disconnects.

use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use sparkgate_common::ErrorResponse;
use sparkgate_submission::naming::executor_pod_name;
use sparkgate_submission::{LogStream, SubmissionError};

use super::query;
use crate::error::{Error, Result};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    pub follow: Option<bool>,
    /// Executor number; negative selects the driver
    pub executor: Option<i64>,
}

pub async fn submission_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: std::result::Result<Query<LogParams>, QueryRejection>,
) -> Response {
    let params = match query(params) {
        Ok(params) => params,
        Err(e) => return e.into_response(),
    };

    match open_log(&state, &id, &params).await {
        Ok((pod, logs)) => {
            let banner = futures::stream::once(async move {
                Ok::<_, std::io::Error>(Bytes::from(format!("Getting log for {}\n", pod)))
            });
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(banner.chain(logs)),
            )
                .into_response()
        }
        Err(e) => {
            warn!(submission = %id, error = %e, "Failed to get log");
            (
                StatusCode::OK,
                Json(ErrorResponse {
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn open_log(state: &AppState, id: &str, params: &LogParams) -> Result<(String, LogStream)> {
    let orchestrator = state.reconciler.orchestrator();

    let pod = match params.executor {
        Some(n) if n >= 0 => {
            let n = u32::try_from(n)
                .map_err(|_| Error::BadRequest(format!("invalid executor number {}", n)))?;
            executor_pod_name(id, n)
        }
        _ => {
            let app = orchestrator
                .get_application(id)
                .await
                .map_err(|e| SubmissionError::from_lookup(id, e))?;
            app.driver_pod_name()
                .map(String::from)
                .ok_or_else(|| Error::Internal(format!("no driver pod for submission {} yet", id)))?
        }
    };

    let follow = params.follow.unwrap_or(false);
    debug!(submission = %id, pod = %pod, follow, "Streaming log");
    let logs = orchestrator
        .stream_logs(&pod, follow)
        .await
        .map_err(SubmissionError::Orchestrator)?;
    Ok((pod, logs))
}
