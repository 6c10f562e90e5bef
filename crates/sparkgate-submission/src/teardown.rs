//! Resource teardown
//!
//! Deletes a resource and waits until the orchestrator stops returning it.
//! Deletion latency is unbounded (finalizers, graceful termination), so the
//! wait is capped by a wall-clock deadline.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use sparkgate_common::{retry_until, RetryError, SparkApplication};

use crate::error::{ResourceKind, Result, SubmissionError};
use crate::naming::ui_service_name;
use crate::orchestrator::Orchestrator;

/// Deadline and poll interval for delete confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeardownPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for TeardownPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Delete `name` and poll until it is gone or `policy.max_wait` elapses.
///
/// A not-found answer to the delete counts as success. Errors while polling are
/// treated as "still present" and polling continues. An empty name is a no-op.
pub async fn delete_and_confirm(
    orchestrator: &dyn Orchestrator,
    kind: ResourceKind,
    name: &str,
    policy: TeardownPolicy,
) -> Result<()> {
    if name.is_empty() {
        return Ok(());
    }

    match orchestrator.delete(kind, name).await {
        Ok(()) => debug!(kind = %kind, name = %name, "Delete issued"),
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(SubmissionError::Orchestrator(e)),
    }

    let gone = move || async move {
        match orchestrator.exists(kind, name).await {
            Ok(found) => Ok::<bool, SubmissionError>(!found),
            Err(e) => {
                debug!(kind = %kind, name = %name, error = %e, "Existence check failed, retrying");
                Ok(false)
            }
        }
    };

    match retry_until(gone, policy.max_wait, policy.poll_interval).await {
        Ok(()) => Ok(()),
        Err(RetryError::Timeout { elapsed, .. }) => Err(SubmissionError::TeardownTimeout {
            kind,
            name: name.to_string(),
            waited: elapsed,
        }),
        Err(RetryError::Aborted(e)) => Err(e),
    }
}

/// Best-effort teardown of a submission's driver, executors and UI service.
///
/// Resources are removed concurrently. Failures are logged and never returned.
pub async fn teardown_dependents(
    orchestrator: &dyn Orchestrator,
    app: &SparkApplication,
    submission_id: &str,
    policy: TeardownPolicy,
) {
    let mut targets: Vec<(ResourceKind, String)> = Vec::new();
    if let Some(driver) = app.driver_pod_name() {
        targets.push((ResourceKind::Pod, driver.to_string()));
    }
    targets.extend(
        app.executor_pod_names()
            .map(|name| (ResourceKind::Pod, name.to_string())),
    );
    targets.push((ResourceKind::Service, ui_service_name(submission_id)));

    info!(
        submission = %submission_id,
        resources = targets.len(),
        "Tearing down dependent resources"
    );

    let results = join_all(targets.iter().map(move |(kind, name)| async move {
        (
            kind,
            name,
            delete_and_confirm(orchestrator, *kind, name, policy).await,
        )
    }))
    .await;

    for (kind, name, result) in results {
        if let Err(e) = result {
            warn!(
                submission = %submission_id,
                kind = %kind,
                name = %name,
                error = %e,
                "Teardown failed, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestratorError;
    use crate::orchestrator::MockOrchestrator;
    use sparkgate_common::{SparkApplicationSpec, SparkApplicationStatus};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn fast_policy() -> TeardownPolicy {
        TeardownPolicy {
            max_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_after_resource_disappears() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let mut mock = MockOrchestrator::new();
        mock.expect_delete()
            .withf(|kind, name| *kind == ResourceKind::Pod && name == "app-1-driver")
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_exists().returning(move |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n <= 2)
        });

        delete_and_confirm(&mock, ResourceKind::Pod, "app-1-driver", fast_policy())
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_resource_never_disappears() {
        let mut mock = MockOrchestrator::new();
        mock.expect_delete().returning(|_, _| Ok(()));
        mock.expect_exists().returning(|_, _| Ok(true));

        let policy = fast_policy();
        let start = tokio::time::Instant::now();
        let err = delete_and_confirm(&mock, ResourceKind::Service, "app-1-ui-svc", policy)
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, SubmissionError::TeardownTimeout { .. }));
        assert!(elapsed >= policy.max_wait);
        assert!(elapsed <= policy.max_wait + policy.poll_interval);
    }

    #[tokio::test]
    async fn not_found_on_delete_is_success() {
        let mut mock = MockOrchestrator::new();
        mock.expect_delete().returning(|kind, name| {
            Err(OrchestratorError::NotFound {
                kind,
                name: name.to_string(),
            })
        });
        mock.expect_exists().never();

        delete_and_confirm(&mock, ResourceKind::Pod, "gone", fast_policy())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_name_is_noop() {
        let mut mock = MockOrchestrator::new();
        mock.expect_delete().never();
        mock.expect_exists().never();

        delete_and_confirm(&mock, ResourceKind::Pod, "", fast_policy())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_keep_polling() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let mut mock = MockOrchestrator::new();
        mock.expect_delete().returning(|_, _| Ok(()));
        mock.expect_exists().returning(move |kind, name| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OrchestratorError::Transport {
                    operation: "get",
                    kind,
                    name: name.to_string(),
                    message: "timeout".to_string(),
                })
            } else {
                Ok(false)
            }
        });

        delete_and_confirm(&mock, ResourceKind::Pod, "app-1-exec-1", fast_policy())
            .await
            .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_covers_driver_executors_and_service() {
        let mut app = SparkApplication::new("app-1", SparkApplicationSpec::default());
        let mut status = SparkApplicationStatus::default();
        status.driver_info.pod_name = Some("app-1-driver".to_string());
        status
            .executor_state
            .insert("app-1-exec-1".to_string(), "RUNNING".to_string());
        status
            .executor_state
            .insert("app-1-exec-2".to_string(), "RUNNING".to_string());
        app.status = Some(status);

        let deleted = Arc::new(Mutex::new(Vec::new()));
        let log = deleted.clone();

        let mut mock = MockOrchestrator::new();
        mock.expect_delete().returning(move |kind, name| {
            log.lock().unwrap().push((kind, name.to_string()));
            Ok(())
        });
        // Service never goes away; the others vanish immediately
        mock.expect_exists()
            .returning(|kind, _| Ok(kind == ResourceKind::Service));

        teardown_dependents(&mock, &app, "app-1", fast_policy()).await;

        let mut deleted = deleted.lock().unwrap().clone();
        deleted.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            deleted,
            vec![
                (ResourceKind::Pod, "app-1-driver".to_string()),
                (ResourceKind::Pod, "app-1-exec-1".to_string()),
                (ResourceKind::Pod, "app-1-exec-2".to_string()),
                (ResourceKind::Service, "app-1-ui-svc".to_string()),
            ]
        );
    }
}
