//! Retry policy for remote model calls
//!
//! Network failures, timeouts, 429 and 5xx responses are retried with
//! exponential backoff; anything else fails on the first attempt.

use crate::errors::{AppError, Result};
use backoff::ExponentialBackoffBuilder;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

/// Bounds for one retried operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, max_elapsed: Duration) -> Self {
        Self {
            max_retries,
            initial_interval: Duration::from_millis(200),
            max_elapsed,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

/// A failed attempt and whether it is worth repeating
#[derive(Debug)]
pub struct RemoteFailure {
    pub error: AppError,
    pub transient: bool,
}

impl RemoteFailure {
    pub fn transient(error: AppError) -> Self {
        Self { error, transient: true }
    }

    pub fn permanent(error: AppError) -> Self {
        Self { error, transient: false }
    }

    /// Classify a transport-level failure
    pub fn from_request(err: &reqwest::Error, wrap: impl FnOnce(String) -> AppError) -> Self {
        let transient = err.is_timeout() || err.is_connect() || err.is_request();
        Self {
            error: wrap(format!("Request failed: {}", err)),
            transient,
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: &str, wrap: impl FnOnce(String) -> AppError) -> Self {
        let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        Self {
            error: wrap(format!("API error {}: {}", status, body)),
            transient,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy is exhausted
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RemoteFailure>>,
{
    let max_retries = policy.max_retries;
    let mut attempts = 0u32;

    let schedule = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_elapsed_time(Some(policy.max_elapsed))
        .build();

    backoff::future::retry_notify(
        schedule,
        || {
            attempts += 1;
            let attempt = attempts;
            let fut = op();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(failure) if failure.transient && attempt <= max_retries => {
                        Err(backoff::Error::transient(failure.error))
                    }
                    Err(failure) => Err(backoff::Error::permanent(failure.error)),
                }
            }
        },
        |err: AppError, wait: Duration| {
            tracing::warn!(
                operation,
                error = %err,
                retry_in_ms = wait.as_millis() as u64,
                "Remote call failed, retrying"
            );
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_interval: Duration::from_millis(1),
            max_elapsed: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RemoteFailure::transient(AppError::EmbeddingError {
                        message: "503".into(),
                    }))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(3), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RemoteFailure::permanent(AppError::EmbeddingError {
                    message: "400".into(),
                }))
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::EmbeddingError { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RemoteFailure::transient(AppError::GenerationError {
                    message: "429".into(),
                }))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_status_classification() {
        let wrap = |m: String| AppError::EmbeddingError { message: m };
        assert!(RemoteFailure::from_status(StatusCode::TOO_MANY_REQUESTS, "", wrap).transient);
        assert!(RemoteFailure::from_status(StatusCode::BAD_GATEWAY, "", wrap).transient);
        assert!(!RemoteFailure::from_status(StatusCode::UNAUTHORIZED, "", wrap).transient);
    }
}
