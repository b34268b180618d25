use std::future::Future;
use std::time::Duration;

use shared_types::AppError;

use super::Engine;

/// Bounded exponential backoff for idempotent follow-up writes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay * (1u32 << exponent)
    }
}

/// Run `write` until it succeeds or the policy is exhausted.
///
/// Only for writes with set semantics (add-to-set, remove-from-set,
/// conditional clears) where a repeated success is harmless.
pub async fn with_retry<F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut write: F,
) -> Result<(), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match write().await {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Follow-up write succeeded after retry");
                }
                return Ok(());
            }
            Err(e) => {
                if attempt < attempts {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Follow-up write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    let err = last_error.unwrap_or_else(|| AppError::internal("Follow-up write failed"));
    tracing::error!(operation, attempts, error = %err, "Follow-up write gave up");
    Err(err)
}

impl Engine {
    /// Follow-up write on a second document, retried per the configured policy.
    pub(crate) async fn follow_up<F, Fut>(&self, operation: &str, write: F) -> Result<(), AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        with_retry(self.settings.retry, operation, write).await
    }

    /// Follow-up once the primary write has committed. The caller already
    /// has its entity, so an exhausted retry is only logged; the next update
    /// re-applies the set write.
    pub(crate) async fn follow_up_after_commit<F, Fut>(&self, operation: &str, write: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        if self.follow_up(operation, write).await.is_err() {
            tracing::warn!(operation, "Follow-up left for the next update");
        }
    }
}
