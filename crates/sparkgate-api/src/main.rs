//! Sparkgate - HTTP gateway for Spark applications on Kubernetes

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sparkgate_api::{
    start_server, AppState, GatewayArgs, GatewayConfig, S3UploadStore, ServerConfig, UploadStore,
};
use sparkgate_submission::{KubeOrchestrator, Reconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::load(GatewayArgs::parse())?;

    let client = kube::Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;
    let orchestrator = Arc::new(KubeOrchestrator::new(client, &config.namespace));

    let reconciler = Reconciler::new(
        orchestrator,
        Arc::new(config.submission.clone()),
        config.namespace.clone(),
        config.teardown,
    );

    let uploads: Option<Arc<dyn UploadStore>> = match &config.s3_bucket {
        Some(bucket) => Some(Arc::new(S3UploadStore::new(&config.s3_region, bucket)?)),
        None => {
            warn!("No S3 bucket configured, uploads are disabled");
            None
        }
    };

    let auth = config.validator();
    if auth.is_none() {
        warn!("No users configured, API authentication is disabled");
    }

    info!(namespace = %config.namespace, "Managing SparkApplications");

    let state = AppState {
        reconciler: Arc::new(reconciler),
        auth,
        uploads,
        upload_root: config.s3_root.clone(),
    };
    let server = ServerConfig {
        addr: config.addr,
        url_prefix: config.url_prefix.clone(),
    };

    start_server(server, state).await?;
    Ok(())
}
