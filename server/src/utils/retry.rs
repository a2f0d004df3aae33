//! Async retry with exponential backoff

use std::time::Duration;

/// Retry an async operation while `should_retry` accepts its error.
///
/// Waits `base_delay_ms * 2^(attempt-1)` between attempts. Returns the first
/// success, or the last error once `max_attempts` is reached or the error is
/// not retryable.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    max_attempts: u32,
    base_delay_ms: u64,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation(attempts).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !should_retry(&e) {
                    return Err(e);
                }
                let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempts - 1));
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_on_first_try() {
        let result = retry_with_backoff(3, 1, |_: &&str| true, |_| async { Ok::<_, &str>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let result = retry_with_backoff(
            3,
            1,
            |_: &&str| true,
            |attempt| async move {
                if attempt < 2 {
                    Err("transient error")
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_failure_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            3,
            1,
            |_: &&str| true,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("persistent error") }
            },
        )
        .await;
        assert_eq!(result, Err("persistent error"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            3,
            1,
            |e: &&str| *e == "retry me",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("fatal") }
            },
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
