use thiserror::Error;

use crate::{OrderId, Version};

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was modified by someone else since it was loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    Conflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// Two writers raced on the order counter for the same year.
    #[error("Order counter contention for year {year}")]
    CounterContention { year: i32 },

    /// An order number was issued twice; the write was rolled back.
    #[error("Duplicate order number: {0}")]
    DuplicateOrderNumber(String),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The write request itself was malformed.
    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    /// A persisted row could not be mapped back to a record.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for lost races that succeed when the whole operation is
    /// repeated against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. }
                | StoreError::CounterContention { .. }
                | StoreError::DuplicateOrderNumber(_)
        )
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
