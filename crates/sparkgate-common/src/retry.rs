//! Deadline-based polling
//!
//! External calls have unbounded latency, so waits are bounded by wall-clock
//! time rather than by attempt count. Uses the tokio clock so tests can pause it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Why [`retry_until`] gave up
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The predicate never returned `true` before the deadline
    #[error("condition not met after {elapsed:?} (max wait {max_wait:?})")]
    Timeout {
        /// Time spent polling
        elapsed: Duration,
        /// Configured deadline
        max_wait: Duration,
    },

    /// The predicate failed and polling stopped
    #[error("{0}")]
    Aborted(E),
}

/// Poll `predicate` every `interval` until it returns `Ok(true)`.
///
/// Returns `Timeout` once `max_wait` has elapsed without success, or
/// `Aborted` with the first predicate error. The predicate is always evaluated
/// at least once, and once more right at the deadline.
pub async fn retry_until<F, Fut, E>(
    mut predicate: F,
    max_wait: Duration,
    interval: Duration,
) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = Instant::now();
    let deadline = start + max_wait;

    loop {
        if predicate().await.map_err(RetryError::Aborted)? {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(RetryError::Timeout {
                elapsed: now - start,
                max_wait,
            });
        }

        debug!(remaining = ?(deadline - now), "Condition not met, retrying");
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_true() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), RetryError<String>> = retry_until(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n == 3) }
            },
            Duration::from_secs(5),
            Duration::from_millis(100),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_within_one_interval_of_deadline() {
        let max_wait = Duration::from_secs(2);
        let interval = Duration::from_millis(300);
        let start = Instant::now();

        let result: Result<(), RetryError<String>> =
            retry_until(|| async { Ok(false) }, max_wait, interval).await;

        let elapsed = start.elapsed();
        match result {
            Err(RetryError::Timeout {
                elapsed: reported, ..
            }) => assert!(reported >= max_wait),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= max_wait);
        assert!(elapsed <= max_wait + interval);
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_error_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_until(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<bool, _>("boom".to_string()) }
            },
            Duration::from_secs(5),
            Duration::from_millis(100),
        )
        .await;

        assert!(matches!(result, Err(RetryError::Aborted(ref e)) if e == "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
