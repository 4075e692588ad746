//! Backoff for status queries that fail below the HTTP layer
//!
//! A status query that never reached the server (connection refused, timed out, reset) is
//! re-issued with exponential backoff. Anything the server actually answered, including a
//! non-success status, is returned to the caller unchanged: HTTP failures are never
//! retried automatically.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as transient or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // The server answered; surface it as-is
            Error::Transport { .. } => false,
            Error::Protocol { .. } => false,
            Error::Serialization(_) => false,
            Error::Validation { .. } => false,
            Error::Config { .. } => false,
            Error::PollDeadlineExceeded { .. } => false,
            Error::Cancelled => false,
        }
    }
}

/// Execute an async operation, retrying transient failures with exponential backoff
///
/// Returns the successful result or the last error once `config.max_attempts` retries
/// are exhausted. Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "request failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(wait).await;

                delay = Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                    .map_or(config.max_delay, |next| next.min(config.max_delay));
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "request failed after all retry attempts"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add up to 100% random jitter, so the delay lands in `[delay, 2 * delay]`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient error"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result = with_retry(&fast_config(3), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result = with_retry(&fast_config(3), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result = with_retry(&fast_config(2), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient)
            }
        })
        .await;

        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(counter.load(Ordering::SeqCst), 3, "initial call plus two retries");
    }

    #[tokio::test]
    async fn permanent_error_is_returned_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();

        let result = with_retry(&fast_config(5), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert!(matches!(result, Err(TestError::Permanent)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_grow_and_are_capped() {
        let start = tokio::time::Instant::now();
        let result = with_retry(&fast_config(4), || async { Err::<(), _>(TestError::Transient) })
            .await;

        assert!(result.is_err());
        // 10 + 20 + 40 + 40 (capped)
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(110) && elapsed < Duration::from_millis(120),
            "{elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_multiplier_is_capped_by_max_delay() {
        let config = RetryConfig {
            backoff_multiplier: 1e300,
            ..fast_config(3)
        };
        let start = tokio::time::Instant::now();

        let result = with_retry(&config, || async { Err::<(), _>(TestError::Transient) }).await;

        assert!(result.is_err());
        // 10 + 40 + 40
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(90) && elapsed < Duration::from_millis(100),
            "{elapsed:?}"
        );
    }

    #[test]
    fn jitter_of_an_extreme_delay_does_not_panic() {
        assert_eq!(add_jitter(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(100);
        for _ in 0..200 {
            let jittered = add_jitter(base);
            assert!(jittered >= base && jittered <= base * 2, "{jittered:?}");
        }
    }

    #[test]
    fn http_failures_are_never_retryable() {
        let error = Error::Transport {
            status: 503,
            reason: "Service Unavailable".into(),
            context: "status query".into(),
        };
        assert!(!error.is_retryable());
        assert!(!Error::protocol("no status", "{}").is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn connection_level_io_errors_are_retryable() {
        for kind in [
            std::io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::TimedOut,
            std::io::ErrorKind::BrokenPipe,
        ] {
            assert!(Error::Io(std::io::Error::from(kind)).is_retryable());
        }
        assert!(!Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied)).is_retryable());
    }
}
