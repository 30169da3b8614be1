//! Orders, their status machine and their history trail.

mod commands;
mod history;
mod model;
mod service;
mod status;
mod value_objects;

pub use commands::{CreateOrder, ItemRequest, OrderFilter, UpdateOrder};
pub use history::{
    OrderChange, OrderCreatedData, OrderHistoryEntry, OrderUpdatedData, StatusChangedData,
};
pub use model::{Order, OrderEdit};
pub use service::OrderService;
pub use status::{OrderStatus, Transition};
pub use value_objects::{Money, OrderItem, total_of};

use chrono::{NaiveDate, Weekday};
use thiserror::Error;

use crate::error::ErrorKind;

/// Upper bound for a unit price, in cents.
pub const MAX_ITEM_PRICE_CENTS: i64 = 100_000_000;

/// Rule violations raised by orders and their status machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Deliveries only happen on Fridays.
    #[error("Delivery date {date} is a {weekday}, deliveries only happen on Fridays")]
    NotAFriday { date: NaiveDate, weekday: Weekday },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity for {dish_name}: {quantity} (must be greater than 0)")]
    InvalidQuantity { dish_name: String, quantity: u32 },

    /// Invalid price.
    #[error(
        "Invalid price for {dish_name}: {price} (must be between 0 and {max})",
        max = MAX_ITEM_PRICE_CENTS
    )]
    InvalidPrice { dish_name: String, price: i64 },

    /// The order total does not fit in the money type.
    #[error("Order total is too large")]
    AmountOverflow,

    /// A line item carries no dish name.
    #[error("Dish name is required for every item")]
    MissingDishName,

    /// The status token is not one of the known statuses.
    #[error("Unknown order status: {0:?}")]
    UnknownStatus(String),

    /// The order is locked in its current status.
    #[error("Cannot {action} an order in {status} state")]
    TerminalState {
        status: OrderStatus,
        action: &'static str,
    },
}

impl OrderError {
    /// Returns the error category callers dispatch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::TerminalState { .. } => ErrorKind::TerminalState,
            _ => ErrorKind::Validation,
        }
    }
}

/// Checks the invariants every line item must satisfy.
pub fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for item in items {
        if item.dish_name.trim().is_empty() {
            return Err(OrderError::MissingDishName);
        }
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                dish_name: item.dish_name.clone(),
                quantity: item.quantity,
            });
        }
        if !(0..=MAX_ITEM_PRICE_CENTS).contains(&item.price.cents()) {
            return Err(OrderError::InvalidPrice {
                dish_name: item.dish_name.clone(),
                price: item.price.cents(),
            });
        }
    }
    total_of(items).map(|_| ())
}
