//! Submission routes: submit, status, list, delete, kill

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use sparkgate_common::crd::state as app_state;
use sparkgate_common::{
    ListSubmissionsResponse, SubmissionActionResponse, SubmissionResponse,
    SubmissionStatusResponse, SubmissionSummary, APPLICATION_NAME_ANNOTATION,
};
use sparkgate_submission::naming::{api_root, spark_ui_path};
use sparkgate_submission::SubmissionError;

use super::{generate_submission_id, parse_submission, query};
use crate::error::Result;
use crate::server::AppState;

const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    pub overwrite: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub state: Option<String>,
}

/// `POST /submissions`: id and overwrite may come in the body
pub async fn submit(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<Json<SubmissionResponse>> {
    let request = parse_submission(&body)?;
    let id = request
        .submission_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_submission_id);
    let overwrite = request.overwrite.unwrap_or(false);

    let submission_id = state
        .reconciler
        .reconcile(&id, request, overwrite, uri.path())
        .await?;
    Ok(Json(SubmissionResponse { submission_id }))
}

/// `POST /submissions/{id}?overwrite=`
pub async fn submit_with_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
    params: std::result::Result<Query<SubmitParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<SubmissionResponse>> {
    let params = query(params)?;
    let request = parse_submission(&body)?;

    let submission_id = state
        .reconciler
        .reconcile(&id, request, params.overwrite.unwrap_or(false), uri.path())
        .await?;
    Ok(Json(SubmissionResponse { submission_id }))
}

/// `GET /submissions/{id}/status`
pub async fn submission_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<SubmissionStatusResponse>> {
    let app = state
        .reconciler
        .orchestrator()
        .get_application(&id)
        .await
        .map_err(|e| SubmissionError::from_lookup(&id, e))?;

    let current = app.state().to_string();
    let spark_ui =
        (current == app_state::RUNNING).then(|| spark_ui_path(api_root(uri.path(), &id), &id));

    Ok(Json(SubmissionStatusResponse {
        submission_id: id.clone(),
        state: current,
        application_message: app.error_message().map(String::from),
        spark_ui,
        recent_app_id: app.recent_app_id().to_string(),
    }))
}

/// `GET /submissions?limit=&state=`
pub async fn list_submissions(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListSubmissionsResponse>> {
    let params = query(params)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let wanted = params.state.as_deref().filter(|s| !s.is_empty());

    // A state filter runs over the full list, the limit applies to its matches
    let apps = state
        .reconciler
        .orchestrator()
        .list_applications(wanted.is_none().then_some(limit))
        .await
        .map_err(SubmissionError::Orchestrator)?;

    let items = apps
        .iter()
        .filter(|app| wanted.is_none_or(|wanted| app.state().eq_ignore_ascii_case(wanted)))
        .take(limit as usize)
        .map(|app| SubmissionSummary {
            submission_id: app.metadata.name.clone().unwrap_or_default(),
            application_name: app.annotation(APPLICATION_NAME_ANNOTATION).map(String::from),
            state: app.state().to_string(),
            recent_app_id: app.recent_app_id().to_string(),
        })
        .collect();

    Ok(Json(ListSubmissionsResponse { items }))
}

/// `DELETE /submissions/{id}`
pub async fn delete_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionActionResponse>> {
    state.reconciler.delete(&id).await?;
    info!(submission = %id, "Deleted via API");
    Ok(Json(SubmissionActionResponse {
        submission_id: id,
        message: "Application deleted".to_string(),
    }))
}

/// `POST /submissions/{id}/kill`
pub async fn kill_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionActionResponse>> {
    state.reconciler.kill(&id).await?;
    Ok(Json(SubmissionActionResponse {
        submission_id: id,
        message: "Application killed".to_string(),
    }))
}
