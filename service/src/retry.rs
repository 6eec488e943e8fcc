//! Retry of units of work that lost an allocation race.
//!
//! Only [`HelpdeskError::ConcurrencyConflict`] is retried: the whole operation is run again,
//! so identifiers are re-allocated from fresh state. Every other error is returned at once.

use helpdesk_core::error::{HelpdeskError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy with exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 20ms
/// - `max_delay`: 1 second
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for the doubling delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Default delays with `max_retries` attempts.
    #[must_use]
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// A policy that never waits, for tests.
    #[must_use]
    pub const fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): doubles each time, capped at
    /// `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|attempt| 2u32.checked_pow(attempt))
            .unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Run `operation`, running it again after a [`HelpdeskError::ConcurrencyConflict`] until
/// the policy is exhausted.
///
/// # Errors
///
/// Returns the first non-conflict error, or the last conflict once retries run out.
pub async fn retry_on_conflict<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut run: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match run().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err @ HelpdeskError::ConcurrencyConflict { .. })
                if attempt < policy.max_retries =>
            {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Allocation conflict, retrying"
                );
                metrics::counter!("helpdesk.conflict.retries", "operation" => operation)
                    .increment(1);
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn conflict() -> HelpdeskError {
        HelpdeskError::ConcurrencyConflict {
            key: "ticket:1".to_string(),
            detail: "record 2 offered, next is 3".to_string(),
        }
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(64), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = AtomicUsize::new(0);
        let result = retry_on_conflict(&RetryPolicy::immediate(3), "append_record", || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move { if call < 2 { Err(conflict()) } else { Ok(call) } }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn conflicts_surface_once_retries_run_out() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry_on_conflict(&RetryPolicy::immediate(2), "create_ticket", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conflict()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry_on_conflict(&RetryPolicy::immediate(5), "create_ticket", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(HelpdeskError::Persistence("down".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(HelpdeskError::Persistence(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
