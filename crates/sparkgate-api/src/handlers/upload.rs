//! `POST /s3/upload?name=`

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;

use sparkgate_common::UploadResponse;

use super::query;
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::storage::upload_key;

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    params: std::result::Result<Query<UploadParams>, QueryRejection>,
    body: Body,
) -> Result<Json<UploadResponse>> {
    let params = query(params)?;
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::BadRequest("missing query string parameter: name".to_string()))?;

    let store = state
        .uploads
        .as_ref()
        .ok_or_else(|| Error::Config("object storage is not configured".to_string()))?;

    let id = uuid::Uuid::new_v4().to_string();
    let key = upload_key(&state.upload_root, &name, &id)
        .ok_or_else(|| Error::BadRequest(format!("invalid file name {}", name)))?;

    let stream = body
        .into_data_stream()
        .map_err(std::io::Error::other)
        .boxed();
    let url = store.upload(&key, stream).await?;

    Ok(Json(UploadResponse { url }))
}
