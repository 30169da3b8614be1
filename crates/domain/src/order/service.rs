//! Order service providing the order lifecycle operations.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use common::OrderId;
use order_store::{NewOrder, OrderQuery, OrderStore, OrderStoreExt};

use crate::allocator::OrderNumberAllocator;
use crate::catalog::{CustomerDirectory, DishCatalog, price_items};
use crate::config::{ServiceConfig, bounded};
use crate::error::DomainError;
use crate::schedule::{Clock, DeliveryScheduler, SystemClock};

use super::{
    CreateOrder, Order, OrderChange, OrderCreatedData, OrderEdit, OrderError, OrderFilter,
    OrderHistoryEntry, OrderStatus, UpdateOrder, total_of, validate_items,
};

/// Service for managing orders.
///
/// Every operation runs under the configured timeout. Writes are a single
/// compare-and-swap on the order version; a lost race reloads the order and
/// tries again, up to the configured number of attempts.
pub struct OrderService<S: OrderStore + Clone> {
    store: S,
    allocator: OrderNumberAllocator<S>,
    scheduler: DeliveryScheduler,
    dishes: Arc<dyn DishCatalog>,
    customers: Arc<dyn CustomerDirectory>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl<S: OrderStore + Clone> OrderService<S> {
    /// Creates a new order service with default scheduling and tuning.
    pub fn new(
        store: S,
        dishes: Arc<dyn DishCatalog>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        let config = ServiceConfig::default();
        Self {
            allocator: OrderNumberAllocator::new(store.clone(), config.retry),
            store,
            scheduler: DeliveryScheduler::default(),
            dishes,
            customers,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_scheduler(mut self, scheduler: DeliveryScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.allocator = OrderNumberAllocator::new(self.store.clone(), config.retry);
        self.config = config;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &DeliveryScheduler {
        &self.scheduler
    }

    pub fn allocator(&self) -> &OrderNumberAllocator<S> {
        &self.allocator
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Places a new order.
    ///
    /// Validates the delivery date and items, snapshots dish names and
    /// prices, and persists the order with its `CREATED` history entry under
    /// a freshly allocated order number.
    #[tracing::instrument(
        skip(self, cmd),
        fields(customer_id = %cmd.customer_id, delivery_date = %cmd.delivery_date)
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        bounded(self.config.operation_timeout, "create_order", async move {
            let delivery_date = self.scheduler.validate(cmd.delivery_date)?;
            if cmd.items.is_empty() {
                return Err(OrderError::NoItems.into());
            }
            if self.customers.customer_name(cmd.customer_id).await?.is_none() {
                return Err(DomainError::not_found("customer", cmd.customer_id));
            }

            let items = price_items(self.dishes.as_ref(), cmd.items, &[]).await?;
            validate_items(&items)?;
            let total = total_of(&items)?;

            let now = self.clock.now();
            let status = OrderStatus::default();
            let created = OrderChange::Created(OrderCreatedData {
                status,
                delivery_date,
                item_count: items.len(),
                total_amount: total,
            });

            let new_order = NewOrder {
                year: self.scheduler.local_time(now).year(),
                customer_id: cmd.customer_id,
                order_date: now,
                delivery_date,
                status: status.as_str().to_string(),
                items: serde_json::to_value(&items)?,
                total_cents: total.cents(),
                notes: cmd.notes,
                created: created.to_new_history()?,
            };

            let stored = self.allocator.create(new_order).await?;
            let order = Order::from_record(stored)?;

            metrics::counter!("orders_created_total").increment(1);
            tracing::info!(
                order_id = %order.id(),
                order_number = %order.order_number(),
                total = %order.total_amount(),
                "Order created"
            );
            Ok(order)
        })
        .await
    }

    /// Moves an order to another status.
    ///
    /// Requesting the current status is a no-op and records nothing.
    /// Delivered and cancelled orders reject every change.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, DomainError> {
        bounded(
            self.config.operation_timeout,
            "update_order_status",
            self.config.retry.run("update_order_status", move || {
                self.try_transition(order_id, new_status)
            }),
        )
        .await
    }

    async fn try_transition(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut order = self.load(order_id).await?;
        let previous = order.status();

        let Some(change) = order.transition(new_status)? else {
            tracing::debug!(%order_id, status = %previous, "Status unchanged");
            return Ok(order);
        };

        let history = vec![change.to_record(order_id)?];
        let stored = self.store.update_order(order.to_record()?, history).await?;
        let order = Order::from_record(stored)?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => previous.as_str(),
            "to" => new_status.as_str()
        )
        .increment(1);
        tracing::info!(%order_id, from = %previous, to = %new_status, "Order status changed");
        Ok(order)
    }

    /// Edits the delivery date, items or notes of an open order.
    ///
    /// Dishes already on the order keep their price snapshot; new dishes are
    /// priced from the catalog. A request that changes nothing records
    /// nothing.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        cmd: UpdateOrder,
    ) -> Result<Order, DomainError> {
        if let Some(date) = cmd.delivery_date {
            self.scheduler.validate(date)?;
        }
        let cmd = &cmd;

        bounded(
            self.config.operation_timeout,
            "update_order",
            self.config
                .retry
                .run("update_order", move || self.try_update(order_id, cmd)),
        )
        .await
    }

    async fn try_update(&self, order_id: OrderId, cmd: &UpdateOrder) -> Result<Order, DomainError> {
        let mut order = self.load(order_id).await?;
        if order.is_terminal() {
            return Err(OrderError::TerminalState {
                status: order.status(),
                action: "edit",
            }
            .into());
        }

        let items = match &cmd.items {
            Some(requests) => {
                if requests.is_empty() {
                    return Err(OrderError::NoItems.into());
                }
                Some(price_items(self.dishes.as_ref(), requests.clone(), order.items()).await?)
            }
            None => None,
        };

        let edit = OrderEdit {
            delivery_date: cmd.delivery_date,
            items,
            notes: cmd.notes.clone(),
        };
        let Some(change) = order.edit(edit)? else {
            tracing::debug!(%order_id, "Edit changed nothing");
            return Ok(order);
        };

        let history = vec![change.to_record(order_id)?];
        let stored = self.store.update_order(order.to_record()?, history).await?;
        let order = Order::from_record(stored)?;

        tracing::info!(%order_id, total = %order.total_amount(), "Order updated");
        Ok(order)
    }

    /// Deletes an order together with its history.
    ///
    /// Delivered orders cannot be deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<(), DomainError> {
        bounded(
            self.config.operation_timeout,
            "delete_order",
            self.config
                .retry
                .run("delete_order", move || self.try_delete(order_id)),
        )
        .await
    }

    async fn try_delete(&self, order_id: OrderId) -> Result<(), DomainError> {
        let order = self.load(order_id).await?;
        order.ensure_deletable()?;
        self.store.delete_order(order_id, order.version()).await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(%order_id, order_number = %order.order_number(), "Order deleted");
        Ok(())
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        bounded(self.config.operation_timeout, "get_order", async {
            match self.store.get_order(order_id).await? {
                Some(stored) => Ok(Some(Order::from_record(stored)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Returns the order's history, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderHistoryEntry>, DomainError> {
        bounded(self.config.operation_timeout, "get_history", async {
            if !self.store.order_exists(order_id).await? {
                return Err(DomainError::not_found("order", order_id));
            }
            let records = self.store.get_history(order_id).await?;
            Ok(records.into_iter().map(OrderHistoryEntry::from).collect())
        })
        .await
    }

    /// Lists orders matching `filter`, ordered by order number.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, DomainError> {
        self.query(OrderQuery::from(filter), "list_orders").await
    }

    /// Orders delivered on `date` whose status is one of `statuses`.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_delivery(
        &self,
        date: NaiveDate,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, DomainError> {
        let query = OrderFilter::new()
            .delivery_date(date)
            .statuses(statuses.iter().copied());
        self.query(query.into(), "orders_for_delivery").await
    }

    /// The first Friday an order placed now can target.
    pub fn next_delivery_date(&self) -> NaiveDate {
        self.scheduler.next_available_date_at(self.clock.now())
    }

    /// The next `count` selectable Fridays, starting now.
    pub fn available_delivery_dates(&self, count: usize) -> Vec<NaiveDate> {
        self.scheduler
            .available_dates(self.clock.now(), count)
            .collect()
    }

    async fn query(
        &self,
        query: OrderQuery,
        operation: &'static str,
    ) -> Result<Vec<Order>, DomainError> {
        bounded(self.config.operation_timeout, operation, async {
            let stored = self.store.query_orders(query).await?;
            Ok(stored
                .into_iter()
                .map(Order::from_record)
                .collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let stored = self.store.require_order(order_id).await?;
        Ok(Order::from_record(stored)?)
    }
}

impl<S: OrderStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            allocator: self.allocator.clone(),
            scheduler: self.scheduler,
            dishes: Arc::clone(&self.dishes),
            customers: Arc::clone(&self.customers),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}
