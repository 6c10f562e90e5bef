//! Orchestrator access
//!
//! [`Orchestrator`] is the only seam between submission logic and Kubernetes.
//! Every call addresses resources by name inside one namespace; the namespace is
//! bound when the implementation is constructed.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use sparkgate_common::SparkApplication;

use crate::error::{OrchestratorError, ResourceKind};

/// Raw container log bytes
pub type LogStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Operations the gateway needs from the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Fetch a SparkApplication; missing resources yield `OrchestratorError::NotFound`
    async fn get_application(&self, name: &str) -> Result<SparkApplication, OrchestratorError>;

    /// Create a SparkApplication
    async fn create_application(
        &self,
        app: SparkApplication,
    ) -> Result<SparkApplication, OrchestratorError>;

    /// List SparkApplications, up to `limit` when one is given
    async fn list_applications(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<SparkApplication>, OrchestratorError>;

    /// Issue a delete for any managed kind
    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), OrchestratorError>;

    /// Whether the named resource currently exists
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, OrchestratorError>;

    /// Stream the log of a pod's main container
    async fn stream_logs(&self, pod: &str, follow: bool) -> Result<LogStream, OrchestratorError>;
}

/// [`Orchestrator`] backed by the Kubernetes API
pub struct KubeOrchestrator {
    client: Client,
    namespace: String,
}

impl KubeOrchestrator {
    /// Create an orchestrator scoped to `namespace`
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

async fn delete_in<K>(api: Api<K>, kind: ResourceKind, name: &str) -> Result<(), OrchestratorError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    api.delete(name, &DeleteParams::default())
        .await
        .map(|_| ())
        .map_err(|e| OrchestratorError::from_kube("delete", kind, name, e))
}

async fn exists_in<K>(api: Api<K>, kind: ResourceKind, name: &str) -> Result<bool, OrchestratorError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    api.get_opt(name)
        .await
        .map(|found| found.is_some())
        .map_err(|e| OrchestratorError::from_kube("get", kind, name, e))
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn get_application(&self, name: &str) -> Result<SparkApplication, OrchestratorError> {
        self.api::<SparkApplication>()
            .get(name)
            .await
            .map_err(|e| OrchestratorError::from_kube("get", ResourceKind::Application, name, e))
    }

    async fn create_application(
        &self,
        app: SparkApplication,
    ) -> Result<SparkApplication, OrchestratorError> {
        let name = app.metadata.name.clone().unwrap_or_default();
        debug!(submission = %name, namespace = %self.namespace, "Creating SparkApplication");
        self.api::<SparkApplication>()
            .create(&PostParams::default(), &app)
            .await
            .map_err(|e| {
                OrchestratorError::from_kube("create", ResourceKind::Application, &name, e)
            })
    }

    async fn list_applications(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<SparkApplication>, OrchestratorError> {
        let params = match limit {
            Some(limit) => ListParams::default().limit(limit),
            None => ListParams::default(),
        };
        self.api::<SparkApplication>()
            .list(&params)
            .await
            .map(|list| list.items)
            .map_err(|e| {
                OrchestratorError::from_kube(
                    "list",
                    ResourceKind::Application,
                    &self.namespace,
                    e,
                )
            })
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), OrchestratorError> {
        match kind {
            ResourceKind::Application => {
                delete_in(self.api::<SparkApplication>(), kind, name).await
            }
            ResourceKind::Pod => delete_in(self.api::<Pod>(), kind, name).await,
            ResourceKind::Service => delete_in(self.api::<Service>(), kind, name).await,
        }
    }

    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, OrchestratorError> {
        match kind {
            ResourceKind::Application => {
                exists_in(self.api::<SparkApplication>(), kind, name).await
            }
            ResourceKind::Pod => exists_in(self.api::<Pod>(), kind, name).await,
            ResourceKind::Service => exists_in(self.api::<Service>(), kind, name).await,
        }
    }

    async fn stream_logs(&self, pod: &str, follow: bool) -> Result<LogStream, OrchestratorError> {
        let params = LogParams {
            follow,
            ..LogParams::default()
        };
        let reader = self
            .api::<Pod>()
            .log_stream(pod, &params)
            .await
            .map_err(|e| OrchestratorError::from_kube("log", ResourceKind::Pod, pod, e))?;

        Ok(ReaderStream::new(reader.compat()).boxed())
    }
}
