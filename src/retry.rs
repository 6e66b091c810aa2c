//! Bounded retry with a fixed inter-attempt delay and a per-attempt
//! deadline, parameterized over any fallible async operation. The probe is
//! the only production caller, but nothing here knows that.

use std::future::Future;

use thiserror::Error;
use tokio::time::{sleep, timeout, Duration};

use crate::error::ApiError;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed wait between failed attempts. No backoff, no jitter.
    pub delay: Duration,
    /// Deadline applied to each attempt individually.
    pub attempt_timeout: Duration,
}

/// Terminal failure after the attempt budget is spent. Carries the attempt
/// count and the last underlying error.
#[derive(Error, Debug)]
#[error("{operation} gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    pub last_error: ApiError,
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// `on_attempt(n, max)` fires before every attempt so callers can surface
/// incremental progress. The delay is skipped after the final attempt.
pub async fn retry_fixed<F, Fut, T, P>(
    policy: &RetryPolicy,
    operation: &str,
    mut on_attempt: P,
    mut op: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
    P: FnMut(u32, u32),
{
    let mut last_error: Option<ApiError> = None;

    for attempt in 1..=policy.max_attempts {
        on_attempt(attempt, policy.max_attempts);

        let result = match timeout(policy.attempt_timeout, op()).await {
            Ok(r) => r,
            Err(_) => Err(ApiError::Timeout {
                endpoint: operation.to_string(),
                waited_ms: policy.attempt_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                log(
                    Level::Warn,
                    Domain::Bootstrap,
                    "retry_attempt_failed",
                    obj(&[
                        ("operation", v_str(operation)),
                        ("attempt", v_num(attempt as f64)),
                        ("max_attempts", v_num(policy.max_attempts as f64)),
                        ("error", v_str(&e.to_string())),
                    ]),
                );
                if attempt < policy.max_attempts {
                    sleep(policy.delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(RetryExhausted {
        operation: operation.to_string(),
        attempts: policy.max_attempts,
        last_error: last_error.unwrap_or_else(|| ApiError::Transport {
            endpoint: operation.to_string(),
            detail: "no attempts were made".to_string(),
        }),
    })
}
