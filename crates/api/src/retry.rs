//! Bounded retry with exponential backoff for transient remote failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::ApiError;

/// Attempts per call, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Delay before the first retry; doubles after each attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Run `attempt_call` until it succeeds, fails non-transiently, or the
/// attempt budget is exhausted.
pub(crate) async fn with_backoff<T, Fut>(
    operation: &str,
    attempt_call: impl FnMut() -> Fut,
) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry_with_schedule(operation, MAX_ATTEMPTS, INITIAL_BACKOFF, attempt_call).await
}

pub(crate) async fn retry_with_schedule<T, Fut>(
    operation: &str,
    max_attempts: u32,
    initial_backoff: Duration,
    mut attempt_call: impl FnMut() -> Fut,
) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut delay = initial_backoff;
    let mut attempt = 1u32;
    loop {
        match attempt_call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(error) => {
                if attempt > 1 {
                    warn!(operation, attempt, "retry budget exhausted");
                }
                return Err(error);
            }
        }
    }
}
