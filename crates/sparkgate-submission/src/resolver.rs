//! Image lookup and namespace defaults
//!
//! The image table and default conf are loaded once at startup and only read
//! while serving requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sparkgate_common::{RestartPolicy, SparkApplicationSpec};

/// One row of the image table
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkImage {
    pub version: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub image: String,
}

/// Namespace-wide submission defaults
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionConfig {
    /// Service account for driver and executor pods
    #[serde(default)]
    pub service_account: Option<String>,

    #[serde(default)]
    pub default_spark_version: Option<String>,

    /// Ordered image table; first match wins
    #[serde(default)]
    pub spark_images: Vec<SparkImage>,

    /// Conf added to every submission unless the caller set the key
    #[serde(default)]
    pub spark_conf: BTreeMap<String, String>,

    /// Let Spark rewrite UI redirects itself instead of pinning them to `/`
    #[serde(rename = "sparkUIModifyRedirectUrl", default)]
    pub modify_redirect_url: bool,
}

/// Find the image for `version`/`app_type`, ignoring case on both.
pub fn find_image<'a>(table: &'a [SparkImage], version: &str, app_type: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|row| {
            row.version.eq_ignore_ascii_case(version) && row.app_type.eq_ignore_ascii_case(app_type)
        })
        .map(|row| row.image.as_str())
}

/// Copy every entry of `from` whose key is absent in `into`.
pub fn merge_defaults(into: &mut BTreeMap<String, String>, from: &BTreeMap<String, String>) {
    for (key, value) in from {
        into.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

/// Fill operator defaults the Spark operator would otherwise apply itself.
///
/// Explicit conf entries (`spark.driver.cores` and friends) count as set.
pub fn apply_spec_defaults(spec: &mut SparkApplicationSpec) {
    if spec.mode.is_none() {
        spec.mode = Some("cluster".to_string());
    }

    let restart = spec.restart_policy.get_or_insert_with(RestartPolicy::default);
    if restart.policy_type.is_none() {
        restart.policy_type = Some("Never".to_string());
    }

    let conf = &spec.spark_conf;
    if spec.driver.cores.is_none() && !conf.contains_key("spark.driver.cores") {
        spec.driver.cores = Some(1);
    }
    if spec.driver.memory.is_none() && !conf.contains_key("spark.driver.memory") {
        spec.driver.memory = Some("1g".to_string());
    }
    if spec.executor.cores.is_none() && !conf.contains_key("spark.executor.cores") {
        spec.executor.cores = Some(1);
    }
    if spec.executor.memory.is_none() && !conf.contains_key("spark.executor.memory") {
        spec.executor.memory = Some("1g".to_string());
    }
    if spec.executor.instances.is_none() && !conf.contains_key("spark.executor.instances") {
        spec.executor.instances = Some(1);
    }
}
