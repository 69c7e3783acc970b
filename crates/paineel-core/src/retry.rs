//! Bounded retry with exponential backoff.
//!
//! A single combinator shared by every component that talks to a flaky
//! remote (ledger API, captcha service): call sites describe the policy and
//! the operation, never hand-roll their own loop.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (treated as at least 1)
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Factor applied to the delay after each further failure
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Delay doubles after every failure.
    #[must_use]
    pub const fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier: 2,
        }
    }

    /// Same delay after every failure.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            multiplier: 1,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 2 seconds, doubling.
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(2))
    }
}

/// Run `task_fn` until it succeeds or the policy's attempts are exhausted.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned unchanged once every attempt has failed.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    task_fn: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_backoff_if(policy, operation, |_| true, task_fn).await
}

/// Like [`retry_with_backoff`], but an error for which `should_retry`
/// returns false is returned at once.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation: &str,
    should_retry: P,
    mut task_fn: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match task_fn(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => {
                error!(operation, attempts = attempt, "not retryable: {e}");
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                error!(operation, attempts = attempt, "giving up: {e}");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    "attempt {}/{} failed, retrying in {:?}: {e}",
                    attempt,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_exponential_delays_double() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_fixed_delays_stay_constant() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(3));
        assert_eq!(policy.delay_after(1), Duration::from_secs(3));
        assert_eq!(policy.delay_after(4), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_second_attempt() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let counter = attempt_count.clone();

        let result = retry_with_backoff(&RetryPolicy::default(), "test", |_| {
            let count = counter.clone();
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst) + 1;
                if current < 2 {
                    Err("transient error")
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("success"));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_attempts() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let counter = attempt_count.clone();

        let result = retry_with_backoff(&RetryPolicy::default(), "test", |_| {
            let count = counter.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("persistent error")
            }
        })
        .await;

        assert_eq!(result, Err("persistent error"));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let mut calls = 0;
        let result = retry_with_backoff_if(
            &RetryPolicy::default(),
            "test",
            |e: &&str| *e != "forbidden",
            |_| {
                calls += 1;
                async { Err::<(), _>("forbidden") }
            },
        )
        .await;

        assert_eq!(result, Err("forbidden"));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_passes_attempt_number() {
        let mut seen = Vec::new();
        let _ = retry_with_backoff(
            &RetryPolicy::fixed(4, Duration::from_millis(10)),
            "test",
            |attempt| {
                seen.push(attempt);
                async { Err::<(), _>("nope") }
            },
        )
        .await;
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result = retry_with_backoff(
            &RetryPolicy::fixed(0, Duration::from_millis(10)),
            "test",
            |_| {
                calls += 1;
                async { Ok::<_, String>(7) }
            },
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
    }
}
