//! Order number allocation.

use order_store::{NewOrder, OrderStore, StoredOrder};

use crate::error::DomainError;
use crate::retry::RetryPolicy;

/// Issues `ORD-<year>-<seq>` numbers from the store's per-year counters.
///
/// A number is only ever issued together with the order that owns it.
/// Contention on the counter row is retried as a whole under the configured
/// [`RetryPolicy`].
#[derive(Clone)]
pub struct OrderNumberAllocator<S: OrderStore> {
    store: S,
    retry: RetryPolicy,
}

impl<S: OrderStore> OrderNumberAllocator<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Persists `order` under a freshly issued number.
    ///
    /// Counter increment, order insert and the first history entry are one
    /// store write, so a failed attempt never consumes a number.
    #[tracing::instrument(skip(self, order), fields(year = order.year))]
    pub async fn create(&self, order: NewOrder) -> Result<StoredOrder, DomainError> {
        self.retry
            .run("create_order", || async {
                Ok(self.store.create_order(order.clone()).await?)
            })
            .await
    }
}
