//! Submission reconciler
//!
//! Turns a submission request into a SparkApplication and decides whether an
//! existing application with the same id may be replaced.
//!
//! # Flow
//!
//! 1. Look up the id: found, not found, or an error that aborts the request
//! 2. Found without overwrite: conflict, nothing is touched
//! 3. Build and validate the new spec, so a bad request never destroys the
//!    running submission
//! 4. Found with overwrite: tear down the driver, executors and UI service,
//!    then delete the old application; failures are logged and ignored
//! 5. Create the new application
//!
//! Mutating operations on one id are serialized by [`SubmissionLocks`]; the
//! orchestrator's own already-exists check backs this up across replicas.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::api::ObjectMeta;
use tracing::{info, warn};

use sparkgate_common::crd::{TYPE_JAVA, TYPE_PYTHON};
use sparkgate_common::{
    SparkApplication, SubmissionRequest, APPLICATION_DESCRIPTION_ANNOTATION,
    APPLICATION_NAME_ANNOTATION,
};

use crate::error::{OrchestratorError, ResourceKind, Result, SubmissionError};
use crate::lock::SubmissionLocks;
use crate::naming::{api_root, spark_ui_path};
use crate::orchestrator::Orchestrator;
use crate::resolver::{apply_spec_defaults, find_image, merge_defaults, SubmissionConfig};
use crate::teardown::{delete_and_confirm, teardown_dependents, TeardownPolicy};
use crate::validator::validate;

const EXECUTOR_POD_NAME_PREFIX_CONF: &str = "spark.kubernetes.executor.podNamePrefix";
const UI_PORT_CONF: &str = "spark.ui.port";
const UI_PORT: &str = "4040";
const UI_PROXY_BASE_CONF: &str = "spark.ui.proxyBase";
const UI_PROXY_REDIRECT_URI_CONF: &str = "spark.ui.proxyRedirectUri";

/// Creates, replaces, deletes and kills submissions
pub struct Reconciler {
    orchestrator: Arc<dyn Orchestrator>,
    config: Arc<SubmissionConfig>,
    namespace: String,
    teardown: TeardownPolicy,
    locks: SubmissionLocks,
}

impl Reconciler {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        config: Arc<SubmissionConfig>,
        namespace: impl Into<String>,
        teardown: TeardownPolicy,
    ) -> Self {
        Self {
            orchestrator,
            config,
            namespace: namespace.into(),
            teardown,
            locks: SubmissionLocks::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<dyn Orchestrator> {
        &self.orchestrator
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create `submission_id`, replacing an existing one only when `overwrite` is set.
    ///
    /// `request_path` is the URL path the request arrived on; the Spark UI proxy
    /// base is derived from it.
    pub async fn reconcile(
        &self,
        submission_id: &str,
        request: SubmissionRequest,
        overwrite: bool,
        request_path: &str,
    ) -> Result<String> {
        let _lock = self.locks.acquire(submission_id).await;

        let existing = match self.orchestrator.get_application(submission_id).await {
            Ok(app) => Some(app),
            Err(OrchestratorError::NotFound { .. }) => None,
            Err(e) => return Err(SubmissionError::Orchestrator(e)),
        };

        if let Some(app) = &existing {
            if !overwrite {
                return Err(SubmissionError::Conflict {
                    id: submission_id.to_string(),
                    namespace: self.namespace.clone(),
                    created_at: app
                        .metadata
                        .creation_timestamp
                        .as_ref()
                        .map(|t| t.0.to_rfc3339())
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
        }

        let app = self.build_application(submission_id, request, request_path)?;
        validate(&app.spec)?;

        if let Some(previous) = existing {
            info!(submission = %submission_id, "Overwriting existing submission");
            self.teardown_and_delete(submission_id, &previous).await;
        }

        self.orchestrator
            .create_application(app)
            .await
            .map_err(|source| SubmissionError::Rejected {
                id: submission_id.to_string(),
                source,
            })?;

        info!(submission = %submission_id, namespace = %self.namespace, "Submission created");
        Ok(submission_id.to_string())
    }

    /// Delete a submission and, best-effort, everything it spawned
    pub async fn delete(&self, submission_id: &str) -> Result<()> {
        let _lock = self.locks.acquire(submission_id).await;

        let app = self
            .orchestrator
            .get_application(submission_id)
            .await
            .map_err(|e| SubmissionError::from_lookup(submission_id, e))?;

        self.orchestrator
            .delete(ResourceKind::Application, submission_id)
            .await
            .map_err(|e| SubmissionError::from_lookup(submission_id, e))?;
        info!(submission = %submission_id, "Submission deleted");

        teardown_dependents(
            self.orchestrator.as_ref(),
            &app,
            submission_id,
            self.teardown,
        )
        .await;
        Ok(())
    }

    /// Stop a submission's pods and UI service, keeping the application record
    pub async fn kill(&self, submission_id: &str) -> Result<()> {
        let _lock = self.locks.acquire(submission_id).await;

        let app = self
            .orchestrator
            .get_application(submission_id)
            .await
            .map_err(|e| SubmissionError::from_lookup(submission_id, e))?;

        teardown_dependents(
            self.orchestrator.as_ref(),
            &app,
            submission_id,
            self.teardown,
        )
        .await;
        info!(submission = %submission_id, "Submission killed");
        Ok(())
    }

    async fn teardown_and_delete(&self, submission_id: &str, previous: &SparkApplication) {
        teardown_dependents(
            self.orchestrator.as_ref(),
            previous,
            submission_id,
            self.teardown,
        )
        .await;

        if let Err(e) = delete_and_confirm(
            self.orchestrator.as_ref(),
            ResourceKind::Application,
            submission_id,
            self.teardown,
        )
        .await
        {
            warn!(
                submission = %submission_id,
                error = %e,
                "Failed to delete previous SparkApplication, creating anyway"
            );
        }
    }

    /// Apply defaults and operational conf to the requested spec
    fn build_application(
        &self,
        submission_id: &str,
        request: SubmissionRequest,
        request_path: &str,
    ) -> Result<SparkApplication> {
        let SubmissionRequest {
            application_name,
            application_description,
            mut spec,
            ..
        } = request;
        let config = &self.config;

        let service_account = non_empty(&config.service_account);
        for account in [
            &mut spec.driver.service_account,
            &mut spec.executor.service_account,
        ] {
            if non_empty(account).is_none() {
                *account = service_account.map(String::from);
            }
        }
        if non_empty(&spec.driver.service_account).is_none()
            || non_empty(&spec.executor.service_account).is_none()
        {
            return Err(SubmissionError::validation(
                "service account is not specified and no default is configured",
            ));
        }

        if non_empty(&spec.spark_version).is_none() {
            spec.spark_version = config.default_spark_version.clone();
        }
        let spark_version = non_empty(&spec.spark_version)
            .ok_or_else(|| {
                SubmissionError::validation(
                    "spark version is not specified and no default is configured",
                )
            })?
            .to_string();

        if non_empty(&spec.app_type).is_none() {
            let inferred = if non_empty(&spec.main_class).is_some() {
                TYPE_JAVA
            } else {
                TYPE_PYTHON
            };
            spec.app_type = Some(inferred.to_string());
        }
        let app_type = spec.app_type.clone().unwrap_or_default();

        if non_empty(&spec.image).is_none() {
            let image = find_image(&config.spark_images, &spark_version, &app_type)
                .ok_or_else(|| {
                    SubmissionError::validation(format!(
                        "no image configured for Spark {} and type {}",
                        spark_version, app_type
                    ))
                })?;
            spec.image = Some(image.to_string());
        }

        merge_defaults(&mut spec.spark_conf, &config.spark_conf);
        spec.spark_conf.insert(
            EXECUTOR_POD_NAME_PREFIX_CONF.to_string(),
            submission_id.to_string(),
        );
        spec.spark_conf
            .insert(UI_PORT_CONF.to_string(), UI_PORT.to_string());
        spec.spark_conf.insert(
            UI_PROXY_BASE_CONF.to_string(),
            spark_ui_path(api_root(request_path, submission_id), submission_id),
        );
        if !config.modify_redirect_url {
            spec.spark_conf
                .insert(UI_PROXY_REDIRECT_URI_CONF.to_string(), "/".to_string());
        }

        apply_spec_defaults(&mut spec);

        let mut annotations = BTreeMap::new();
        if let Some(name) = application_name.filter(|n| !n.is_empty()) {
            annotations.insert(APPLICATION_NAME_ANNOTATION.to_string(), name);
        }
        if let Some(description) = application_description.filter(|d| !d.is_empty()) {
            annotations.insert(APPLICATION_DESCRIPTION_ANNOTATION.to_string(), description);
        }

        Ok(SparkApplication {
            metadata: ObjectMeta {
                name: Some(submission_id.to_string()),
                namespace: Some(self.namespace.clone()),
                annotations: (!annotations.is_empty()).then_some(annotations),
                ..ObjectMeta::default()
            },
            spec,
            status: None,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
