//! Identifier types shared by every crate in the order engine.

mod order_number;
mod types;

pub use order_number::{OrderNumber, OrderNumberParseError};
pub use types::{CustomerId, DishId, HistoryEntryId, OrderId};
