//! SparkApplication CRD types
//!
//! Mirrors `sparkoperator.k8s.io/v1beta2` `SparkApplication`. Only the fields the
//! gateway reasons about are typed; everything else a caller sends is carried
//! through untouched in the `extra` maps so newer operator fields keep working.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Workload type tag for JVM applications
pub const TYPE_JAVA: &str = "Java";

/// Workload type tag for PySpark applications
pub const TYPE_PYTHON: &str = "Python";

/// Application states reported by the Spark operator
pub mod state {
    /// No state reported yet
    pub const UNKNOWN: &str = "UNKNOWN";
    /// Accepted by the operator, driver not yet running
    pub const SUBMITTED: &str = "SUBMITTED";
    /// Driver is running
    pub const RUNNING: &str = "RUNNING";
    /// Finished successfully
    pub const COMPLETED: &str = "COMPLETED";
    /// Finished unsuccessfully
    pub const FAILED: &str = "FAILED";
    /// spark-submit itself failed
    pub const SUBMISSION_FAILED: &str = "SUBMISSION_FAILED";
    /// Waiting to be resubmitted
    pub const PENDING_RERUN: &str = "PENDING_RERUN";
}

// =============================================================================
// Spec
// =============================================================================

/// Desired state of a Spark application
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "sparkoperator.k8s.io",
    version = "v1beta2",
    kind = "SparkApplication",
    plural = "sparkapplications",
    shortname = "sparkapp",
    namespaced,
    status = "SparkApplicationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplicationSpec {
    /// Workload type (`Java`, `Scala`, `Python`, `R`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,

    /// Spark version the image was built for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_version: Option<String>,

    /// Deploy mode, `cluster` unless set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Image used by both driver and executors unless overridden per role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Entry point class for JVM applications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    /// Application artifact (jar or python file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_application_file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,

    /// Spark configuration properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spark_conf: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hadoop_conf: BTreeMap<String, String>,

    #[serde(default)]
    pub driver: DriverSpec,

    #[serde(default)]
    pub executor: ExecutorSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_retries: Option<i32>,

    /// Operator fields the gateway does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Driver pod settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Executor pod settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Operator restart behaviour
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestartPolicy {
    /// `Never`, `OnFailure` or `Always`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure_retries: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure_retry_interval: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_submission_failure_retries: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_submission_failure_retry_interval: Option<i64>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state written by the Spark operator
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkApplicationStatus {
    /// Spark's own application id (`spark-...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spark_application_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submission_attempt_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_time: Option<String>,

    #[serde(default)]
    pub driver_info: DriverInfo,

    #[serde(default)]
    pub application_state: ApplicationState,

    /// Executor pod name to executor state
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub executor_state: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_attempts: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_attempts: Option<i32>,
}

/// Driver pod and UI endpoints
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct DriverInfo {
    #[serde(rename = "webUIServiceName", default, skip_serializing_if = "Option::is_none")]
    pub web_ui_service_name: Option<String>,

    #[serde(rename = "webUIPort", default, skip_serializing_if = "Option::is_none")]
    pub web_ui_port: Option<i32>,

    #[serde(rename = "webUIAddress", default, skip_serializing_if = "Option::is_none")]
    pub web_ui_address: Option<String>,

    #[serde(rename = "podName", default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
}

/// Application lifecycle state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    #[serde(default)]
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SparkApplication {
    /// Current state, `UNKNOWN` when the operator has not reported one
    pub fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.application_state.state.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(state::UNKNOWN)
    }

    /// Driver pod name, if the operator has launched one
    pub fn driver_pod_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.driver_info.pod_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Names of every executor pod the operator has observed
    pub fn executor_pod_names(&self) -> impl Iterator<Item = &str> {
        self.status
            .iter()
            .flat_map(|s| s.executor_state.keys())
            .map(String::as_str)
    }

    /// Spark's application id, empty when unknown
    pub fn recent_app_id(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.spark_application_id.as_deref())
            .unwrap_or_default()
    }

    /// Operator error message for failed runs
    pub fn error_message(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.application_state.error_message.as_deref())
            .filter(|m| !m.is_empty())
    }

    /// Annotation value, if present
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}
