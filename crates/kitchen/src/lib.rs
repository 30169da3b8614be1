//! Kitchen-facing batch cooking view.
//!
//! Sums the line items of every open order due on a delivery day per dish,
//! with a drill-down of which customer gets how many portions and what
//! special instructions apply.

pub mod aggregator;
pub mod error;
pub mod service;

pub use aggregator::{
    CategoryBatch, DishAggregate, OrderContribution, aggregate_for_delivery, group_by_category,
};
pub use error::{KitchenError, Result};
pub use service::{KitchenService, effective_statuses};
