//! Shared fixed-interval retry utility.
//!
//! Both the search paginator and the discovery orchestrator retry
//! transient external failures with the same budget semantics: a fixed
//! number of attempts separated by a fixed interval, no backoff growth.

use crate::core::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// A bounded retry budget: `max_attempts` tries separated by `interval`.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        RetryBudget {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

/// Runs `op` until it succeeds or the budget is spent.
///
/// Non-retriable failures (`Config`, `Structural`) are returned
/// immediately; anything else counts against the budget. When the
/// budget is exhausted the last error is wrapped in
/// [`AppError::Exhausted`].
pub async fn retry_with_budget<T, F, Fut>(
    budget: &RetryBudget,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<AppError> = None;

    for attempt in 1..=budget.max_attempts {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(target: "retry", "[{}] Succeeded on attempt {}/{}.",
                        label, attempt, budget.max_attempts);
                }
                return Ok(value);
            }
            Err(e @ AppError::Config(_)) | Err(e @ AppError::Structural(_)) => {
                tracing::debug!(target: "retry", "[{}] Non-retriable error: {}", label, e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(target: "retry", "[{}] Attempt {}/{} failed: {}",
                    label, attempt, budget.max_attempts, e);
                last_error = Some(e);
                if attempt < budget.max_attempts {
                    tokio::time::sleep(budget.interval).await;
                }
            }
        }
    }

    let detail = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no attempts executed".to_string());
    Err(AppError::Exhausted(format!(
        "{}: gave up after {} attempts ({})",
        label, budget.max_attempts, detail
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_spending_budget() {
        let budget = RetryBudget::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result = retry_with_budget(&budget, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AppError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_exhausts() {
        let budget = RetryBudget::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_budget(&budget, "flaky", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Capability("down".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Exhausted(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let budget = RetryBudget::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result = retry_with_budget(&budget, "recovering", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::Capability("warming up".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn structural_failures_are_not_retried() {
        let budget = RetryBudget::new(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_budget(&budget, "malformed", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Structural("garbage payload".to_string()))
        })
        .await;
        assert!(matches!(result, Err(AppError::Structural(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
