//! Service tuning knobs.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default upper bound for a single service operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeouts and retry behavior shared by the order services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Upper bound for one operation, retries included.
    pub operation_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ServiceConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Runs `fut` under `timeout`.
///
/// Dropping a timed-out future rolls back any open store transaction, so no
/// partial write survives.
pub(crate) async fn bounded<T, Fut>(
    timeout: Duration,
    operation: &'static str,
    fut: Fut,
) -> Result<T, crate::DomainError>
where
    Fut: std::future::Future<Output = Result<T, crate::DomainError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("order_operation_timeouts_total", "operation" => operation)
                .increment(1);
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "Operation timed out");
            Err(crate::DomainError::Timeout {
                operation,
                after: timeout,
            })
        }
    }
}
