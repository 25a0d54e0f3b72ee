//! Retry combinator with exponential backoff
//!
//! Wraps calls to volatile dependencies (resource construction, the
//! classification call, handler calls that opt in). Only errors whose
//! [`RouterError::is_retryable`] is true are attempted again; anything else
//! is returned unchanged on the spot.

use std::future::Future;
use std::time::Duration;

use crate::error::RouterError;

/// Backoff and attempt limits for [`with_retry`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Seconds multiplied by `2^(attempt - 1)` to get the raw delay
    pub multiplier: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Total invocations, including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            multiplier: 1.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately, used where waiting adds nothing
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            multiplier: 0.0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    ///
    /// `max(min_delay, min(max_delay, multiplier * 2^(attempt - 1)))`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let raw = self.multiplier * 2f64.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        let min = self.min_delay.as_secs_f64();

        let secs = if raw.is_nan() { min } else { raw.min(max).max(min) };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Run `operation` until it succeeds, fails terminally, or runs out of attempts.
///
/// The error of the last attempt is propagated unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RouterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RouterError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    log::debug!("[RETRY] '{}' succeeded on attempt {}", label, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "[RETRY] '{}' attempt {}/{} failed: {}; retrying in {:?}",
                    label,
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    log::error!(
                        "[RETRY] '{}' giving up after {} attempts: {}",
                        label,
                        attempt,
                        e
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Check if an HTTP status code indicates a retryable error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        408 | // Request Timeout
        429 | // Too Many Requests
        500 | // Internal Server Error (sometimes transient)
        502 | // Bad Gateway
        503 | // Service Unavailable
        504 | // Gateway Timeout
        520 | // Cloudflare - Web Server Returned an Unknown Error
        521 | // Cloudflare - Web Server Is Down
        522 | // Cloudflare - Connection Timed Out
        523 | // Cloudflare - Origin Is Unreachable
        524   // Cloudflare - A Timeout Occurred
    )
}

/// Helper function to check if a reqwest error is retryable
pub fn is_reqwest_error_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err.is_request()
        || err.status().map(|s| is_retryable_status(s.as_u16())).unwrap_or(false)
}

/// Map a reqwest transport error onto the router taxonomy
pub fn from_reqwest_error(context: &str, err: reqwest::Error) -> RouterError {
    if is_reqwest_error_retryable(&err) {
        RouterError::retryable(format!("{}: {}", context, err))
    } else {
        RouterError::upstream(format!("{}: {}", context, err))
    }
}

/// Map a non-success HTTP status onto the router taxonomy
pub fn from_status(context: &str, status: u16, body: &str) -> RouterError {
    let msg = format!("{} returned status {}: {}", context, status, body);
    if is_retryable_status(status) {
        RouterError::retryable(msg)
    } else {
        RouterError::upstream(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy {
            multiplier: 5.0,
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            max_attempts: 10,
        };

        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
        assert_eq!(policy.delay_for(4), Duration::from_secs(40));
        // Capped
        assert_eq!(policy.delay_for(5), Duration::from_secs(60));
        assert_eq!(policy.delay_for(40), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_floor() {
        let policy = RetryPolicy {
            multiplier: 0.1,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            max_attempts: 3,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_retry_bound_propagates_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), RouterError> = with_retry(&policy, "always_fails", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(RouterError::retryable(format!("attempt {}", n))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RouterError::Retryable(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_terminal_error_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(5);

        let result: Result<(), RouterError> = with_retry(&policy, "terminal", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RouterError::UnknownCategory("image".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RouterError::UnknownCategory(_))));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result = with_retry(&policy, "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RouterError::retryable("503"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_status_mapping() {
        assert!(from_status("search", 503, "busy").is_retryable());
        assert!(!from_status("search", 400, "bad request").is_retryable());
    }
}
