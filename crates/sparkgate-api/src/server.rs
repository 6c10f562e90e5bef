//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use sparkgate_submission::Reconciler;

use crate::auth::require_basic_auth;
use crate::auth_chain::CredentialValidator;
use crate::error::{Error, Result};
use crate::handlers::{
    delete_submission, kill_submission, list_submissions, submission_log, submission_status,
    submit, submit_with_id, upload,
};
use crate::storage::UploadStore;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// Path prefix in front of `/v1`, empty or starting with `/`
    pub url_prefix: String,
}

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Submission lifecycle
    pub reconciler: Arc<Reconciler>,
    /// Basic-auth validator; `None` disables authentication
    pub auth: Option<Arc<dyn CredentialValidator>>,
    /// Artifact store; `None` disables uploads
    pub uploads: Option<Arc<dyn UploadStore>>,
    /// Key prefix for uploaded artifacts
    pub upload_root: String,
}

/// Build the gateway router.
///
/// Everything under `{url_prefix}/v1` requires credentials when a validator is
/// configured; the health routes never do.
pub fn router(state: AppState, url_prefix: &str) -> Router {
    let api = Router::new()
        .route("/submissions", post(submit).get(list_submissions))
        .route(
            "/submissions/{id}",
            post(submit_with_id).delete(delete_submission),
        )
        .route("/submissions/{id}/status", get(submission_status))
        .route("/submissions/{id}/log", get(submission_log))
        .route("/submissions/{id}/kill", post(kill_submission))
        .route("/s3/upload", post(upload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .with_state(state);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/healthcheck", get(health))
        .nest(&format!("{}/v1", url_prefix), api)
}

async fn health() -> &'static str {
    "OK"
}

/// Serve until ctrl-c
pub async fn start_server(config: ServerConfig, state: AppState) -> Result<()> {
    let app = router(state, &config.url_prefix);

    let listener = TcpListener::bind(config.addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind {}: {}", config.addr, e)))?;

    info!(
        addr = %config.addr,
        api = %format!("{}/v1", config.url_prefix),
        "Starting gateway server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    info!("Gateway server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_chain::SingleUserValidator;
    use crate::error::BASIC_AUTH_CHALLENGE;
    use crate::storage::memory::MemoryUploadStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::{json, Value};
    use sparkgate_common::crd::{state as app_state, ApplicationState, DriverInfo};
    use sparkgate_common::SparkApplicationStatus;
    use sparkgate_submission::{
        InMemoryOrchestrator, ResourceKind, SparkImage, SubmissionConfig, TeardownPolicy,
    };
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tower::ServiceExt;

    const PREFIX: &str = "/sparkapi";

    struct Harness {
        orchestrator: Arc<InMemoryOrchestrator>,
        uploads: Arc<MemoryUploadStore>,
        app: Router,
    }

    fn submission_config() -> SubmissionConfig {
        SubmissionConfig {
            service_account: Some("spark".to_string()),
            default_spark_version: Some("3.1".to_string()),
            spark_images: vec![
                SparkImage {
                    version: "3.1".to_string(),
                    app_type: "Python".to_string(),
                    image: "spark-py:3.1".to_string(),
                },
                SparkImage {
                    version: "3.1".to_string(),
                    app_type: "Java".to_string(),
                    image: "spark:3.1".to_string(),
                },
            ],
            ..SubmissionConfig::default()
        }
    }

    fn harness(auth: Option<Arc<dyn CredentialValidator>>) -> Harness {
        let orchestrator = Arc::new(InMemoryOrchestrator::new());
        let uploads = Arc::new(MemoryUploadStore::default());
        let reconciler = Reconciler::new(
            orchestrator.clone(),
            Arc::new(submission_config()),
            "spark-applications",
            TeardownPolicy {
                max_wait: Duration::from_secs(1),
                poll_interval: Duration::from_millis(10),
            },
        );
        let state = AppState {
            reconciler: Arc::new(reconciler),
            auth,
            uploads: Some(uploads.clone()),
            upload_root: "api-gateway-root".to_string(),
        };
        Harness {
            orchestrator,
            uploads,
            app: router(state, PREFIX),
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Body) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn python_app() -> Body {
        Body::from(
            json!({
                "mainApplicationFile": "s3a://bucket/job.py",
                "applicationName": "nightly"
            })
            .to_string(),
        )
    }

    fn running_status(id: &str) -> SparkApplicationStatus {
        SparkApplicationStatus {
            spark_application_id: Some("spark-0001".to_string()),
            driver_info: DriverInfo {
                pod_name: Some(format!("{}-driver", id)),
                ..DriverInfo::default()
            },
            application_state: ApplicationState {
                state: app_state::RUNNING.to_string(),
                error_message: None,
            },
            executor_state: BTreeMap::from([(
                format!("{}-exec-1", id),
                app_state::RUNNING.to_string(),
            )]),
            ..SparkApplicationStatus::default()
        }
    }

    #[tokio::test]
    async fn health_routes_skip_auth() {
        let h = harness(Some(Arc::new(SingleUserValidator::new("admin", "secret"))));
        for path in ["/", "/health", "/healthcheck"] {
            let response = send(&h.app, Method::GET, path, Body::empty()).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
    }

    #[tokio::test]
    async fn submit_conflict_then_overwrite() {
        let h = harness(None);
        let uri = "/sparkapi/v1/submissions/app-1";

        let response = send(&h.app, Method::POST, uri, python_app()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"submissionId": "app-1"}));

        let stored = h.orchestrator.application("app-1").await.unwrap();
        assert_eq!(stored.spec.image.as_deref(), Some("spark-py:3.1"));
        assert_eq!(
            stored.spec.spark_conf.get("spark.ui.proxyBase").map(String::as_str),
            Some("/sparkapi/v1/sparkui/app-1")
        );

        let response = send(&h.app, Method::POST, uri, python_app()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("app-1"), "{}", message);
        assert!(h.orchestrator.deleted().await.is_empty());

        h.orchestrator.set_status("app-1", running_status("app-1")).await;

        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/submissions/app-1?overwrite=true",
            python_app(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut deleted = h.orchestrator.deleted().await;
        deleted.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            deleted,
            vec![
                (ResourceKind::Application, "app-1".to_string()),
                (ResourceKind::Pod, "app-1-driver".to_string()),
                (ResourceKind::Pod, "app-1-exec-1".to_string()),
                (ResourceKind::Service, "app-1-ui-svc".to_string()),
            ]
        );
        let replaced = h.orchestrator.application("app-1").await.unwrap();
        assert!(replaced.status.is_none());
    }

    #[tokio::test]
    async fn submit_generates_id_when_absent() {
        let h = harness(None);
        let response = send(&h.app, Method::POST, "/sparkapi/v1/submissions", python_app()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let id = body_json(response).await["submissionId"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(id.starts_with("app-"));
        assert!(h.orchestrator.application(&id).await.is_some());
    }

    #[tokio::test]
    async fn submit_rejects_bad_input() {
        let h = harness(None);

        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/submissions/app-1",
            Body::from("{not json"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/submissions/app-1?overwrite=maybe",
            python_app(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/submissions/app-1",
            Body::from(json!({"mainApplicationFile": "x.py", "sparkVersion": "9.9"}).to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(
            message.ends_with("no image configured for Spark 9.9 and type Python"),
            "{}",
            message
        );
        assert!(h.orchestrator.application("app-1").await.is_none());
    }

    #[tokio::test]
    async fn unauthorized_requests_get_challenge() {
        let h = harness(Some(Arc::new(SingleUserValidator::new("admin", "secret"))));

        let response = send(&h.app, Method::GET, "/sparkapi/v1/submissions", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_AUTH_CHALLENGE
        );

        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sparkapi/v1/submissions")
                    .header(
                        header::AUTHORIZATION,
                        format!("Basic {}", STANDARD.encode("admin:secret")),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_spark_ui_while_running() {
        let h = harness(None);
        send(&h.app, Method::POST, "/sparkapi/v1/submissions/app-1", python_app()).await;

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/app-1/status",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({"submissionId": "app-1", "state": "UNKNOWN", "recentAppId": ""})
        );

        h.orchestrator.set_status("app-1", running_status("app-1")).await;
        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/app-1/status",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({
                "submissionId": "app-1",
                "state": "RUNNING",
                "sparkUI": "/sparkapi/v1/sparkui/app-1",
                "recentAppId": "spark-0001"
            })
        );

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/missing/status",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_by_state() {
        let h = harness(None);
        send(&h.app, Method::POST, "/sparkapi/v1/submissions/app-1", python_app()).await;
        send(&h.app, Method::POST, "/sparkapi/v1/submissions/app-2", python_app()).await;
        h.orchestrator.set_status("app-2", running_status("app-2")).await;

        let response = send(&h.app, Method::GET, "/sparkapi/v1/submissions", Body::empty()).await;
        let items = body_json(response).await["items"].as_array().unwrap().clone();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["applicationName"], "nightly");

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions?state=running",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({"items": [{
                "submissionId": "app-2",
                "applicationName": "nightly",
                "state": "RUNNING",
                "recentAppId": "spark-0001"
            }]})
        );

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions?limit=lots",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_limit_counts_only_matching_states() {
        let h = harness(None);
        for id in ["app-1", "app-2", "app-3"] {
            let path = format!("/sparkapi/v1/submissions/{}", id);
            send(&h.app, Method::POST, &path, python_app()).await;
        }
        h.orchestrator.set_status("app-2", running_status("app-2")).await;
        h.orchestrator.set_status("app-3", running_status("app-3")).await;

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions?limit=1&state=RUNNING",
            Body::empty(),
        )
        .await;
        let items = body_json(response).await["items"].as_array().unwrap().clone();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["submissionId"], "app-2");

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions?limit=5&state=RUNNING",
            Body::empty(),
        )
        .await;
        let items = body_json(response).await["items"].as_array().unwrap().clone();
        assert_eq!(items.len(), 2);

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions?limit=2",
            Body::empty(),
        )
        .await;
        let items = body_json(response).await["items"].as_array().unwrap().clone();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["submissionId"], "app-1");
    }

    #[tokio::test]
    async fn delete_and_kill() {
        let h = harness(None);
        send(&h.app, Method::POST, "/sparkapi/v1/submissions/app-1", python_app()).await;
        h.orchestrator.set_status("app-1", running_status("app-1")).await;

        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/submissions/app-1/kill",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({"submissionId": "app-1", "message": "Application killed"})
        );
        assert!(h.orchestrator.application("app-1").await.is_some());
        assert!(h
            .orchestrator
            .deleted()
            .await
            .contains(&(ResourceKind::Pod, "app-1-driver".to_string())));

        let response = send(
            &h.app,
            Method::DELETE,
            "/sparkapi/v1/submissions/app-1",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({"submissionId": "app-1", "message": "Application deleted"})
        );
        assert!(h.orchestrator.application("app-1").await.is_none());

        let response = send(
            &h.app,
            Method::DELETE,
            "/sparkapi/v1/submissions/app-1",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn log_streams_driver_and_executor() {
        let h = harness(None);
        send(&h.app, Method::POST, "/sparkapi/v1/submissions/app-1", python_app()).await;
        h.orchestrator.set_status("app-1", running_status("app-1")).await;
        h.orchestrator.set_logs("app-1-driver", b"driver line\n").await;
        h.orchestrator.set_logs("app-1-exec-1", b"executor line\n").await;

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/app-1/log",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "Getting log for app-1-driver\ndriver line\n"
        );

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/app-1/log?executor=1&follow=true",
            Body::empty(),
        )
        .await;
        assert_eq!(
            body_text(response).await,
            "Getting log for app-1-exec-1\nexecutor line\n"
        );
    }

    #[tokio::test]
    async fn log_errors_are_reported_in_body() {
        let h = harness(None);
        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/missing/log",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("missing"), "{}", message);

        let response = send(
            &h.app,
            Method::GET,
            "/sparkapi/v1/submissions/app-1/log?executor=one",
            Body::empty(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_streams_to_store() {
        let h = harness(None);
        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/s3/upload?name=job.py",
            Body::from("print('hi')"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let url = body_json(response).await["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("s3a://test-bucket/api-gateway-root/jy/"), "{}", url);
        assert!(url.ends_with("/job.py"));

        let objects = h.uploads.objects.lock().await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.values().next().unwrap(), b"print('hi')");
    }

    #[tokio::test]
    async fn upload_requires_name() {
        let h = harness(None);
        let response = send(
            &h.app,
            Method::POST,
            "/sparkapi/v1/s3/upload",
            Body::from("data"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_prefix_serves_at_v1() {
        let orchestrator: Arc<InMemoryOrchestrator> = Arc::new(InMemoryOrchestrator::new());
        let state = AppState {
            reconciler: Arc::new(Reconciler::new(
                orchestrator,
                Arc::new(submission_config()),
                "ns",
                TeardownPolicy::default(),
            )),
            auth: None,
            uploads: None,
            upload_root: "root".to_string(),
        };
        let app = router(state, "");

        let response = send(&app, Method::GET, "/v1/submissions", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::POST, "/v1/s3/upload?name=a.jar", Body::from("x")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
