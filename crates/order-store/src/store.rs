use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    HistoryRecord, NewOrder, OrderId, OrderQuery, Result, StoreError, StoredOrder, Version,
};

/// Core trait for order persistence.
///
/// Every method is a single all-or-nothing write or a read; implementations
/// must be thread-safe (Send + Sync). Updates and deletes are
/// compare-and-swap operations on the order [`Version`].
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns the last issued sequence for `year`, if any.
    ///
    /// Counters only ever advance inside [`create_order`](Self::create_order).
    async fn counter_value(&self, year: i32) -> Result<Option<u32>>;

    /// Persists a new order.
    ///
    /// Increments the year counter, inserts the order at [`Version::first`]
    /// and writes its first history entry in one transaction.
    async fn create_order(&self, order: NewOrder) -> Result<StoredOrder>;

    /// Loads an order. Returns None if it doesn't exist.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<StoredOrder>>;

    /// Retrieves orders matching a query.
    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<StoredOrder>>;

    /// Replaces an order's mutable fields and appends `history`.
    ///
    /// `order.version` is the version the caller loaded. Fails with
    /// `Conflict` if the stored version differs. Returns the order at its
    /// new version.
    async fn update_order(
        &self,
        order: StoredOrder,
        history: Vec<HistoryRecord>,
    ) -> Result<StoredOrder>;

    /// Deletes an order together with its history.
    ///
    /// Fails with `Conflict` if the stored version differs from `expected`.
    async fn delete_order(&self, order_id: OrderId, expected: Version) -> Result<()>;

    /// Returns an order's history, newest first.
    async fn get_history(&self, order_id: OrderId) -> Result<Vec<HistoryRecord>>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Checks if an order exists.
    async fn order_exists(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.get_order(order_id).await?.is_some())
    }

    /// Loads an order, failing with `OrderNotFound` if it doesn't exist.
    async fn require_order(&self, order_id: OrderId) -> Result<StoredOrder> {
        self.get_order(order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    /// Retrieves the orders delivered on `date` whose status is one of `statuses`.
    async fn orders_for_delivery(
        &self,
        date: NaiveDate,
        statuses: Vec<String>,
    ) -> Result<Vec<StoredOrder>> {
        self.query_orders(OrderQuery::for_delivery_date(date).statuses(statuses))
            .await
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Validates history entries before they are written alongside an update.
pub fn validate_history_for_update(
    order_id: OrderId,
    history: &[HistoryRecord],
) -> std::result::Result<(), StoreError> {
    if let Some(stray) = history.iter().find(|h| h.order_id != order_id) {
        return Err(StoreError::InvalidWrite(format!(
            "history entry {} belongs to order {}, not {}",
            stray.id, stray.order_id, order_id
        )));
    }
    if let Some(blank) = history.iter().find(|h| h.action.trim().is_empty()) {
        return Err(StoreError::InvalidWrite(format!(
            "history entry {} has an empty action",
            blank.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_history_for_the_same_order() {
        let order_id = OrderId::new();
        let history = vec![HistoryRecord::new(
            order_id,
            "STATUS_CHANGED",
            serde_json::json!({}),
        )];
        assert!(validate_history_for_update(order_id, &history).is_ok());
        assert!(validate_history_for_update(order_id, &[]).is_ok());
    }

    #[test]
    fn rejects_history_for_another_order() {
        let history = vec![HistoryRecord::new(
            OrderId::new(),
            "STATUS_CHANGED",
            serde_json::json!({}),
        )];
        let result = validate_history_for_update(OrderId::new(), &history);
        assert!(matches!(result, Err(StoreError::InvalidWrite(_))));
    }

    #[test]
    fn rejects_blank_actions() {
        let order_id = OrderId::new();
        let history = vec![HistoryRecord::new(order_id, "  ", serde_json::json!({}))];
        let result = validate_history_for_update(order_id, &history);
        assert!(matches!(result, Err(StoreError::InvalidWrite(_))));
    }
}
