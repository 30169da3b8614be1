//! Kitchen service serving the batch-cooking view.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use domain::{CustomerDirectory, DishCatalog, OrderService, OrderStatus};
use order_store::OrderStore;

use crate::Result;
use crate::aggregator::{CategoryBatch, DishAggregate, aggregate_for_delivery, group_by_category};

/// Resolves the statuses a kitchen view covers.
///
/// No filter (or an empty one) means `CONFIRMED, PREPARING`. Terminal
/// statuses are dropped even when asked for.
pub fn effective_statuses(requested: Option<&[OrderStatus]>) -> Vec<OrderStatus> {
    match requested {
        Some(statuses) if !statuses.is_empty() => {
            let mut seen = HashSet::new();
            statuses
                .iter()
                .copied()
                .filter(|s| !s.is_terminal())
                .filter(|s| seen.insert(*s))
                .collect()
        }
        _ => OrderStatus::KITCHEN_ACTIVE.to_vec(),
    }
}

/// Builds kitchen views from persisted orders and the dish and customer
/// read models.
pub struct KitchenService<S: OrderStore + Clone> {
    orders: OrderService<S>,
    dishes: Arc<dyn DishCatalog>,
    customers: Arc<dyn CustomerDirectory>,
}

impl<S: OrderStore + Clone> KitchenService<S> {
    pub fn new(
        orders: OrderService<S>,
        dishes: Arc<dyn DishCatalog>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            orders,
            dishes,
            customers,
        }
    }

    /// Per-dish totals for the orders delivered on `date`.
    ///
    /// A dish or customer that can no longer be resolved degrades to the
    /// data snapshotted on the order instead of failing the view.
    #[tracing::instrument(skip(self))]
    pub async fn get_aggregated_dishes_for_date(
        &self,
        date: NaiveDate,
        status_filter: Option<&[OrderStatus]>,
    ) -> Result<Vec<DishAggregate>> {
        let started = Instant::now();
        let statuses = effective_statuses(status_filter);
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let orders = self.orders.orders_for_delivery(date, &statuses).await?;

        let mut dish_ids: Vec<_> = orders
            .iter()
            .flat_map(|o| o.items().iter().map(|i| i.dish_id))
            .collect();
        dish_ids.sort_unstable();
        dish_ids.dedup();
        let mut customer_ids: Vec<_> = orders.iter().map(|o| o.customer_id()).collect();
        customer_ids.sort_unstable();
        customer_ids.dedup();

        let dishes = self.dishes.get_dishes(&dish_ids).await?;
        let customer_names = self.customers.customer_names(&customer_ids).await?;
        if dishes.len() < dish_ids.len() {
            tracing::warn!(
                missing = dish_ids.len() - dishes.len(),
                "Some dishes are no longer in the catalog, using order snapshots"
            );
        }

        let aggregates = aggregate_for_delivery(&orders, &dishes, &customer_names);

        metrics::histogram!("kitchen_aggregation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            orders = orders.len(),
            dishes = aggregates.len(),
            "Kitchen batch aggregated"
        );
        Ok(aggregates)
    }

    /// Same as [`get_aggregated_dishes_for_date`](Self::get_aggregated_dishes_for_date),
    /// grouped per category with subtotals.
    pub async fn get_batches_for_date(
        &self,
        date: NaiveDate,
        status_filter: Option<&[OrderStatus]>,
    ) -> Result<Vec<CategoryBatch>> {
        let aggregates = self
            .get_aggregated_dishes_for_date(date, status_filter)
            .await?;
        Ok(group_by_category(aggregates))
    }
}

impl<S: OrderStore + Clone> Clone for KitchenService<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            dishes: Arc::clone(&self.dishes),
            customers: Arc::clone(&self.customers),
        }
    }
}
