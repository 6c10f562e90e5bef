//! In-memory orchestrator for tests
//!
//! Keeps SparkApplications, pods and services in maps and records every delete,
//! so gateway tests can run full request flows without a cluster.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tokio::sync::Mutex;

use sparkgate_common::{SparkApplication, SparkApplicationStatus};

use crate::error::{OrchestratorError, ResourceKind};
use crate::naming::ui_service_name;
use crate::orchestrator::{LogStream, Orchestrator};

#[derive(Default)]
struct State {
    applications: BTreeMap<String, SparkApplication>,
    pods: BTreeSet<String>,
    services: BTreeSet<String>,
    logs: BTreeMap<String, Vec<u8>>,
    deleted: Vec<(ResourceKind, String)>,
}

/// [`Orchestrator`] holding everything in memory
#[derive(Default)]
pub struct InMemoryOrchestrator {
    state: Mutex<State>,
}

impl InMemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play the Spark operator: attach a status and create the pods and
    /// UI service it names
    pub async fn set_status(&self, name: &str, status: SparkApplicationStatus) {
        let mut state = self.state.lock().await;
        if let Some(pod) = status.driver_info.pod_name.clone() {
            state.pods.insert(pod);
        }
        for pod in status.executor_state.keys() {
            state.pods.insert(pod.clone());
        }
        state.services.insert(ui_service_name(name));
        if let Some(app) = state.applications.get_mut(name) {
            app.status = Some(status);
        }
    }

    /// Register log output for a pod
    pub async fn set_logs(&self, pod: &str, content: &[u8]) {
        let mut state = self.state.lock().await;
        state.pods.insert(pod.to_string());
        state.logs.insert(pod.to_string(), content.to_vec());
    }

    /// Every delete issued so far, in order
    pub async fn deleted(&self) -> Vec<(ResourceKind, String)> {
        self.state.lock().await.deleted.clone()
    }

    /// Stored application, if any
    pub async fn application(&self, name: &str) -> Option<SparkApplication> {
        self.state.lock().await.applications.get(name).cloned()
    }
}

fn not_found(kind: ResourceKind, name: &str) -> OrchestratorError {
    OrchestratorError::NotFound {
        kind,
        name: name.to_string(),
    }
}

#[async_trait]
impl Orchestrator for InMemoryOrchestrator {
    async fn get_application(&self, name: &str) -> Result<SparkApplication, OrchestratorError> {
        self.state
            .lock()
            .await
            .applications
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::Application, name))
    }

    async fn create_application(
        &self,
        mut app: SparkApplication,
    ) -> Result<SparkApplication, OrchestratorError> {
        let name = app.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.lock().await;
        if state.applications.contains_key(&name) {
            return Err(OrchestratorError::Api {
                operation: "create",
                kind: ResourceKind::Application,
                name: name.clone(),
                code: 409,
                message: format!("sparkapplications \"{}\" already exists", name),
            });
        }
        app.metadata.creation_timestamp = Some(Time(chrono::Utc::now()));
        state.applications.insert(name, app.clone());
        Ok(app)
    }

    async fn list_applications(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<SparkApplication>, OrchestratorError> {
        Ok(self
            .state
            .lock()
            .await
            .applications
            .values()
            .take(limit.map_or(usize::MAX, |l| l as usize))
            .cloned()
            .collect())
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), OrchestratorError> {
        let mut state = self.state.lock().await;
        state.deleted.push((kind, name.to_string()));
        let removed = match kind {
            ResourceKind::Application => state.applications.remove(name).is_some(),
            ResourceKind::Pod => state.pods.remove(name),
            ResourceKind::Service => state.services.remove(name),
        };
        if removed {
            Ok(())
        } else {
            Err(not_found(kind, name))
        }
    }

    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, OrchestratorError> {
        let state = self.state.lock().await;
        Ok(match kind {
            ResourceKind::Application => state.applications.contains_key(name),
            ResourceKind::Pod => state.pods.contains(name),
            ResourceKind::Service => state.services.contains(name),
        })
    }

    async fn stream_logs(&self, pod: &str, _follow: bool) -> Result<LogStream, OrchestratorError> {
        let content = self
            .state
            .lock()
            .await
            .logs
            .get(pod)
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::Pod, pod))?;

        Ok(futures::stream::iter(vec![Ok(Bytes::from(content))]).boxed())
    }
}
