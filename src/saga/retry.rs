//! Per-step retry policies and the step runner.
//!
//! Each saga step runs under a policy that bounds individual attempts with
//! a timeout and spaces retries with exponential backoff. A timed-out
//! attempt counts against the budget like a failed one; a non-retryable
//! error aborts immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::PaymentError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_multiplier: f64,
    /// Upper bound on a single attempt, not on the whole step.
    pub start_to_close_timeout: Duration,
}

impl RetryPolicy {
    /// Transfer step: few attempts, generous per-attempt timeout. The
    /// transfer touches locked account rows, so hammering it buys nothing.
    pub fn transfer() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            start_to_close_timeout: Duration::from_secs(10),
        }
    }

    /// Notification step: more attempts, tighter timeout. Publishing is
    /// cheap to retry and the outbox absorbs anything left over.
    pub fn notification() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            start_to_close_timeout: Duration::from_secs(5),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(self.initial_interval.as_secs_f64() * factor)
    }
}

/// Run one saga step under `policy`.
///
/// Exhausting the attempt budget yields [`PaymentError::RetriesExhausted`]
/// carrying the last observed error.
pub async fn run_step<T, F, Fut>(
    step: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, PaymentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PaymentError>>,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.start_to_close_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.retryable() => return Err(e),
            Ok(Err(e)) => {
                warn!(step = step, attempt = attempt, error = %e, "Step attempt failed");
                last_error = e.to_string();
            }
            Err(_) => {
                warn!(
                    step = step,
                    attempt = attempt,
                    timeout_ms = policy.start_to_close_timeout.as_millis() as u64,
                    "Step attempt timed out"
                );
                last_error = format!(
                    "attempt timed out after {:?}",
                    policy.start_to_close_timeout
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
    }

    Err(PaymentError::RetriesExhausted {
        step: step.to_string(),
        attempts: policy.max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            backoff_multiplier: 1.0,
            start_to_close_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = run_step("step", &fast_policy(5), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PaymentError>(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = run_step("step", &fast_policy(5), move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PaymentError::Store("connection reset".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_aborts_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = run_step("step", &fast_policy(5), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(PaymentError::Internal("invariant broken".into()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PaymentError::Internal(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let err = run_step("publish", &fast_policy(3), || async {
            Err::<(), _>(PaymentError::Channel("broker down".into()))
        })
        .await
        .unwrap_err();

        match err {
            PaymentError::RetriesExhausted {
                step,
                attempts,
                last_error,
            } => {
                assert_eq!(step, "publish");
                assert_eq!(attempts, 3);
                assert!(last_error.contains("broker down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_attempt() {
        let policy = RetryPolicy {
            start_to_close_timeout: Duration::from_millis(5),
            ..fast_policy(2)
        };
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let err = run_step("slow", &policy, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, PaymentError>(())
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, PaymentError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
