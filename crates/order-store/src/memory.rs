use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    HistoryRecord, NewOrder, OrderId, OrderNumber, OrderQuery, Result, StoreError, StoredOrder,
    Version,
    store::{OrderStore, validate_history_for_update},
};

#[derive(Default)]
struct State {
    counters: HashMap<i32, u32>,
    orders: HashMap<OrderId, StoredOrder>,
    history: HashMap<OrderId, Vec<HistoryRecord>>,
}

impl State {
    fn increment(&mut self, year: i32) -> u32 {
        let count = self.counters.entry(year).or_insert(0);
        *count += 1;
        *count
    }

    fn check_version(&self, order_id: OrderId, expected: Version) -> Result<()> {
        let current = self
            .orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?
            .version;
        if current != expected {
            return Err(StoreError::Conflict {
                order_id,
                expected,
                actual: current,
            });
        }
        Ok(())
    }
}

/// In-memory order store.
///
/// All state sits behind one lock, so each write is atomic with respect to
/// every other operation. Provides the same interface as the PostgreSQL
/// implementation and backs the tests and the database-less server mode.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of history entries across all orders.
    pub async fn history_count(&self) -> usize {
        self.state.read().await.history.values().map(Vec::len).sum()
    }

    /// Clears all orders, history and counters.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = State::default();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn counter_value(&self, year: i32) -> Result<Option<u32>> {
        Ok(self.state.read().await.counters.get(&year).copied())
    }

    async fn create_order(&self, order: NewOrder) -> Result<StoredOrder> {
        let mut state = self.state.write().await;

        let sequence = state.increment(order.year);
        let order_number = OrderNumber::new(order.year, sequence);

        let id = OrderId::new();
        let stored = StoredOrder {
            id,
            version: Version::first(),
            order_number,
            customer_id: order.customer_id,
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            status: order.status,
            items: order.items,
            total_cents: order.total_cents,
            notes: order.notes,
            updated_at: order.order_date,
        };

        let created = order.created.for_order(id, order.order_date);
        state.orders.insert(id, stored.clone());
        state.history.insert(id, vec![created]);

        Ok(stored)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<StoredOrder>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<StoredOrder>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| query.matches(o.delivery_date, &o.status, o.customer_id))
            .cloned()
            .collect();

        orders.sort_by_key(|o| o.order_number);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_order(
        &self,
        order: StoredOrder,
        history: Vec<HistoryRecord>,
    ) -> Result<StoredOrder> {
        validate_history_for_update(order.id, &history)?;

        let mut state = self.state.write().await;
        state.check_version(order.id, order.version)?;

        let updated = StoredOrder {
            version: order.version.next(),
            updated_at: Utc::now(),
            ..order
        };
        state.orders.insert(updated.id, updated.clone());
        state
            .history
            .entry(updated.id)
            .or_default()
            .extend(history);

        Ok(updated)
    }

    async fn delete_order(&self, order_id: OrderId, expected: Version) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_version(order_id, expected)?;

        state.orders.remove(&order_id);
        state.history.remove(&order_id);
        Ok(())
    }

    async fn get_history(&self, order_id: OrderId) -> Result<Vec<HistoryRecord>> {
        let state = self.state.read().await;
        let mut history = state.history.get(&order_id).cloned().unwrap_or_default();
        // Insertion order breaks ties between entries stamped in the same instant.
        history.reverse();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }
}
