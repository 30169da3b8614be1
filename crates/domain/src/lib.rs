//! Domain layer for the restaurant order engine.
//!
//! This crate provides:
//! - The order entity with its status state machine and history trail
//! - Friday delivery scheduling under a weekly cutoff policy
//! - Gap-free per-year order number allocation
//! - Read-only dish and customer collaborators
//! - `OrderService`, which ties them to an [`order_store::OrderStore`]

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod error;
pub mod order;
pub mod retry;
pub mod schedule;

pub use allocator::OrderNumberAllocator;
pub use catalog::{
    CatalogError, CustomerDirectory, Dish, DishCatalog, DishCategory, InMemoryCustomerDirectory,
    InMemoryDishCatalog, price_items,
};
pub use common::{CustomerId, DishId, HistoryEntryId, OrderId, OrderNumber};
pub use config::ServiceConfig;
pub use error::{DomainError, ErrorKind};
pub use order::{
    CreateOrder, ItemRequest, Money, Order, OrderChange, OrderError, OrderFilter,
    OrderHistoryEntry, OrderItem, OrderService, OrderStatus, UpdateOrder,
};
pub use retry::RetryPolicy;
pub use schedule::{AvailableDates, Clock, CutoffPolicy, DeliveryScheduler, FixedClock, SystemClock};
