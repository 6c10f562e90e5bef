//! Gateway wire protocol (v1)
//!
//! All bodies are flat camelCase JSON objects. A submission request is the
//! SparkApplication spec with a few gateway-level fields alongside it.

use serde::{Deserialize, Serialize};

use crate::crd::SparkApplicationSpec;

/// Body of `POST /submissions` and `POST /submissions/{id}`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Requested id; only honoured on `POST /submissions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,

    /// Replace an existing submission with the same id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_description: Option<String>,

    /// Hint only, never enforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<String>,

    #[serde(flatten)]
    pub spec: SparkApplicationSpec,
}

/// Response of both submit routes
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub submission_id: String,
}

/// Response of `GET /submissions/{id}/status`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatusResponse {
    pub submission_id: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_message: Option<String>,
    /// Path of the Spark UI, only while the application is running
    #[serde(rename = "sparkUI", default, skip_serializing_if = "Option::is_none")]
    pub spark_ui: Option<String>,
    #[serde(default)]
    pub recent_app_id: String,
}

/// Response of delete and kill
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionActionResponse {
    pub submission_id: String,
    pub message: String,
}

/// One row of `GET /submissions`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub submission_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub recent_app_id: String,
}

/// Response of `GET /submissions`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ListSubmissionsResponse {
    pub items: Vec<SubmissionSummary>,
}

/// Response of `POST /s3/upload`
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct UploadResponse {
    pub url: String,
}

/// Error body for every non-2xx response
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}
