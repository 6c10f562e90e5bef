//! Gateway configuration
//!
//! Command-line flags (with environment fallbacks) cover the server itself. An
//! optional YAML or JSON file carries the submission defaults, extra users and
//! teardown timing:
//!
//! ```yaml
//! submissionConfig:
//!   serviceAccount: spark
//!   defaultSparkVersion: "3.1"
//!   sparkImages:
//!     - {version: "3.1", type: java, image: registry/spark:3.1}
//!   sparkConf:
//!     spark.eventLog.enabled: "true"
//!   sparkUIModifyRedirectUrl: false
//! users:
//!   - {name: alice, password: secret}
//! teardown:
//!   maxWaitSeconds: 30
//!   pollIntervalMillis: 100
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing::info;

use sparkgate_submission::{SubmissionConfig, TeardownPolicy};

use crate::auth_chain::{AuthChain, CredentialValidator, MultiUserValidator, SingleUserValidator};
use crate::error::{Error, Result};

/// HTTP gateway for Spark applications on Kubernetes
#[derive(Parser, Debug, Clone)]
#[command(name = "sparkgate", version, about, long_about = None)]
pub struct GatewayArgs {
    /// Port to listen on
    #[arg(long, env = "SPARKGATE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Path prefix in front of `/v1`
    #[arg(long, env = "SPARKGATE_URL_PREFIX", default_value = "/sparkapi")]
    pub url_prefix: String,

    /// Namespace SparkApplications are created in
    #[arg(long, env = "SPARKGATE_NAMESPACE", default_value = "spark-applications")]
    pub namespace: String,

    /// Basic-auth user; authentication is disabled when no user is configured
    #[arg(long, env = "SPARKGATE_USER")]
    pub user: Option<String>,

    /// Basic-auth password; generated when a user is set without one
    #[arg(long, env = "SPARKGATE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "SPARKGATE_S3_REGION", default_value = "us-west-1")]
    pub s3_region: String,

    /// Bucket for uploaded artifacts; uploads are disabled without it
    #[arg(long, env = "SPARKGATE_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix for uploaded artifacts
    #[arg(long, env = "SPARKGATE_S3_ROOT", default_value = "api-gateway-root")]
    pub s3_root: String,

    /// YAML or JSON file with submission defaults
    #[arg(long, env = "SPARKGATE_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// Contents of `--config-file`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub submission_config: SubmissionConfig,

    #[serde(default)]
    pub users: Vec<UserEntry>,

    #[serde(default)]
    pub teardown: TeardownConfig,
}

/// Additional basic-auth user
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub password: String,
}

/// Overrides for delete confirmation timing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownConfig {
    pub max_wait_seconds: Option<u64>,
    pub poll_interval_millis: Option<u64>,
}

impl TeardownConfig {
    fn policy(&self) -> TeardownPolicy {
        let default = TeardownPolicy::default();
        TeardownPolicy {
            max_wait: self
                .max_wait_seconds
                .map(Duration::from_secs)
                .unwrap_or(default.max_wait),
            poll_interval: self
                .poll_interval_millis
                .map(Duration::from_millis)
                .unwrap_or(default.poll_interval),
        }
    }
}

/// Resolved gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub addr: SocketAddr,
    /// Normalized prefix, either empty or starting with `/`
    pub url_prefix: String,
    pub namespace: String,
    /// Single user from the command line, password already resolved
    pub user: Option<(String, String)>,
    /// Users from the config file
    pub users: HashMap<String, String>,
    pub s3_region: String,
    pub s3_bucket: Option<String>,
    pub s3_root: String,
    pub submission: SubmissionConfig,
    pub teardown: TeardownPolicy,
}

impl GatewayConfig {
    /// Merge command-line arguments with the optional config file
    pub fn load(args: GatewayArgs) -> Result<Self> {
        let file = match &args.config_file {
            Some(path) => load_file_config(path)?,
            None => FileConfig::default(),
        };

        let user = match args.user.filter(|u| !u.is_empty()) {
            Some(user) => {
                let password = match args.password.filter(|p| !p.is_empty()) {
                    Some(password) => password,
                    None => {
                        let generated = uuid::Uuid::new_v4().to_string();
                        info!(user = %user, password = %generated, "Generated password for gateway user");
                        generated
                    }
                };
                Some((user, password))
            }
            None => None,
        };

        Ok(Self {
            addr: SocketAddr::from(([0, 0, 0, 0], args.port)),
            url_prefix: normalize_prefix(&args.url_prefix),
            namespace: args.namespace,
            user,
            users: file
                .users
                .into_iter()
                .map(|u| (u.name, u.password))
                .collect(),
            s3_region: args.s3_region,
            s3_bucket: args.s3_bucket.filter(|b| !b.is_empty()),
            s3_root: args.s3_root,
            submission: file.submission_config,
            teardown: file.teardown.policy(),
        })
    }

    /// Validator for the configured users, `None` when authentication is off
    pub fn validator(&self) -> Option<Arc<dyn CredentialValidator>> {
        let mut validators: Vec<Arc<dyn CredentialValidator>> = Vec::new();
        if let Some((user, password)) = &self.user {
            validators.push(Arc::new(SingleUserValidator::new(user, password)));
        }
        if !self.users.is_empty() {
            validators.push(Arc::new(MultiUserValidator::new(self.users.clone())));
        }

        match validators.len() {
            0 => None,
            1 => validators.pop(),
            _ => Some(Arc::new(AuthChain::new(validators))),
        }
    }
}

/// Parse a YAML or JSON config file
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    serde_yaml::from_str(&data)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

/// `/sparkapi/` -> `/sparkapi`, `sparkapi` -> `/sparkapi`, `/` -> ``
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> GatewayArgs {
        let mut argv = vec!["sparkgate"];
        argv.extend_from_slice(extra);
        GatewayArgs::parse_from(argv)
    }

    #[test]
    fn defaults() {
        let config = GatewayConfig::load(args(&[])).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.url_prefix, "/sparkapi");
        assert_eq!(config.s3_region, "us-west-1");
        assert_eq!(config.s3_root, "api-gateway-root");
        assert_eq!(config.s3_bucket, None);
        assert_eq!(config.teardown, TeardownPolicy::default());
        assert!(config.validator().is_none());
    }

    #[test]
    fn user_without_password_gets_generated_one() {
        let config = GatewayConfig::load(args(&["--user", "admin"])).unwrap();
        let (user, password) = config.user.clone().unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password.len(), 36);

        let validator = config.validator().unwrap();
        assert!(validator.validate("admin", &password).is_ok());
    }

    #[test]
    fn yaml_file_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
submissionConfig:
  serviceAccount: spark
  defaultSparkVersion: "3.1"
  sparkImages:
    - version: "3.1"
      type: java
      image: spark-java:3.1
  sparkConf:
    spark.eventLog.enabled: "true"
  sparkUIModifyRedirectUrl: true
users:
  - name: alice
    password: a-pass
teardown:
  maxWaitSeconds: 5
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let config = GatewayConfig::load(args(&[
            "--config-file",
            &path,
            "--user",
            "admin",
            "--password",
            "secret",
        ]))
        .unwrap();

        let submission = &config.submission;
        assert_eq!(submission.service_account.as_deref(), Some("spark"));
        assert_eq!(submission.default_spark_version.as_deref(), Some("3.1"));
        assert_eq!(submission.spark_images.len(), 1);
        assert_eq!(submission.spark_images[0].app_type, "java");
        assert!(submission.modify_redirect_url);
        assert_eq!(config.teardown.max_wait, Duration::from_secs(5));
        assert_eq!(config.teardown.poll_interval, Duration::from_millis(100));

        let validator = config.validator().unwrap();
        assert!(validator.validate("admin", "secret").is_ok());
        assert!(validator.validate("alice", "a-pass").is_ok());
        assert!(validator.validate("alice", "secret").is_err());
    }

    #[test]
    fn json_file_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"submissionConfig": {{"defaultSparkVersion": "2.4", "sparkImages": [{{"version": "2.4", "type": "python", "image": "py:2.4"}}]}}}}"#
        )
        .unwrap();

        let config = load_file_config(file.path()).unwrap();
        assert_eq!(
            config.submission_config.default_spark_version.as_deref(),
            Some("2.4")
        );
        assert_eq!(config.submission_config.spark_images[0].image, "py:2.4");
    }

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("/sparkapi"), "/sparkapi");
        assert_eq!(normalize_prefix("sparkapi/"), "/sparkapi");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }
}
