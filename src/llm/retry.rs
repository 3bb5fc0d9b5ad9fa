use crate::llm::types::{BackendError, LLMError, ProviderKind};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Explicit retry/backoff policy owned by a provider adapter.
///
/// The delay before attempt `n + 1` is `base_delay * multiplier^(n - 1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, failures propagate immediately.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Five attempts, sleeping 1, 2, 4 and 8 seconds in between.
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(16),
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.max(0.0).powi(exponent);
        let delay = Duration::try_from_secs_f64(scaled).unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails non-transiently, or the
    /// attempt budget is spent.
    pub async fn execute<T, F, Fut>(
        &self,
        provider: ProviderKind,
        mut operation: F,
    ) -> Result<T, LLMError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(%provider, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let exhausted = attempt >= max_attempts;
                    if exhausted || !err.is_transient() {
                        error!(%provider, attempt, error = %err, "Provider call failed");
                        return Err(LLMError::Provider {
                            provider,
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }

                    let delay = self.delay_after(attempt);
                    warn!(
                        %provider,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}
