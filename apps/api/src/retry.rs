//! Generic async retry with fixed backoff growth.
//!
//! Used for every call to the generative model. Persistence calls are not
//! wrapped: a database failure is surfaced to the caller as-is.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to retry and how long to wait between attempts.
///
/// With the defaults (2 retries, 1s initial delay, factor 1.5) a permanently
/// failing operation is attempted 3 times with waits of 1s and 1.5s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_delay: Duration,
    /// Must be greater than 1. Enforced by `Config::from_env`.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 1.5,
        }
    }
}

/// Runs `operation` until it succeeds or the retry budget is spent.
///
/// Returns the last error on exhaustion. The number of sleeps equals the
/// number of retries actually performed.
pub async fn with_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_when(operation_name, policy, operation, |_| true).await
}

/// Like `with_retry`, but an error for which `should_retry` returns false is
/// returned immediately without spending the budget.
pub async fn with_retry_when<F, Fut, T, E, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut remaining = policy.retries;
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if !should_retry(&err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Operation failed with non-retryable error"
                );
                return Err(err);
            }
            Err(err) if remaining == 0 => {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "Operation failed, retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
                remaining -= 1;
                attempt += 1;
            }
        }
    }
}
