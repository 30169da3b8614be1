//! Bounded retries for writes that lose optimistic-concurrency races.

use std::future::Future;
use std::time::Duration;

use crate::error::DomainError;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay in milliseconds, doubled after every failed attempt.
pub const DEFAULT_BASE_DELAY_MS: u64 = 10;

/// How often, and how patiently, a conflicting write is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// Each attempt must start from freshly loaded state; the closure is
    /// called again for every retry.
    pub async fn run<T, F, Fut>(&self, name: &'static str, mut operation: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(e) if e.is_retryable() => {
                    metrics::counter!("order_write_conflicts_total", "operation" => name)
                        .increment(1);
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            operation = name,
                            attempts = attempt,
                            error = %e,
                            "Giving up after repeated write conflicts"
                        );
                        return Err(DomainError::Conflict {
                            operation: name,
                            attempts: attempt,
                        });
                    }
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        operation = name,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Write conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
