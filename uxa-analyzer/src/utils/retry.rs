//! Bounded retry for external calls
//!
//! Every inference call goes through [`retry_external_call`]: a bounded number
//! of retries with exponential backoff, capped by a wall-clock budget. Only
//! transient failures (network, timeout, HTTP 429, HTTP 5xx) are retried.

use crate::error::ServiceError;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Retry policy (`[retry]` config section)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Upper bound for a single delay
    pub max_backoff_ms: u64,
    /// Total wall-clock budget across attempts and delays
    pub max_elapsed_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
            max_elapsed_ms: 300_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Run an external call with bounded retries
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If the error is retryable, retries remain and the backoff fits in the
///    wall-clock budget: log WARN, sleep, retry
/// 4. Otherwise return the last error
///
/// **Backoff:** starts at `initial_backoff_ms`, doubles per retry, capped at `max_backoff_ms`.
pub async fn retry_external_call<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(policy.max_elapsed_ms);
    let mut attempt: u32 = 0;
    let mut backoff_ms = policy.initial_backoff_ms;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying external call");
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "External call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }

                if attempt > policy.max_retries {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "External call failed: retries exhausted"
                    );
                    return Err(err);
                }

                let delay = Duration::from_millis(backoff_ms.min(policy.max_backoff_ms));
                let elapsed = start_time.elapsed();

                if elapsed + delay >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_elapsed_ms = policy.max_elapsed_ms,
                        error = %err,
                        "External call failed: retry budget exceeded"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "External call failed, will retry after backoff"
                );

                tokio::time::sleep(delay).await;
                backoff_ms = backoff_ms.saturating_mul(2).min(policy.max_backoff_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            max_elapsed_ms: 5_000,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_external_call("test_op", &fast_policy(1), || async {
            Ok::<i32, ServiceError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_error() {
        let mut attempts = 0;

        let result = retry_external_call("test_op", &fast_policy(1), || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 2 {
                    Err(ServiceError::Network("connection reset".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut attempts = 0;

        let result = retry_external_call("test_op", &fast_policy(2), || {
            attempts += 1;
            async { Err::<i32, _>(ServiceError::Api(503, "unavailable".into())) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Api(503, _))));
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_external_call("test_op", &fast_policy(3), || {
            attempts += 1;
            async { Err::<i32, _>(ServiceError::Auth(401)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_wall_clock_budget_stops_retries() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 50,
            max_backoff_ms: 50,
            max_elapsed_ms: 20,
        };
        let mut attempts = 0;

        let result = retry_external_call("test_op", &policy, || {
            attempts += 1;
            async { Err::<i32, _>(ServiceError::Timeout("slow".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_none_policy() {
        assert_eq!(RetryPolicy::none().max_retries, 0);
        assert_eq!(RetryPolicy::default().max_retries, 1);
    }
}
