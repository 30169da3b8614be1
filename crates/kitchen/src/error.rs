//! Kitchen error types.

use domain::{CatalogError, DomainError, ErrorKind};
use thiserror::Error;

/// Errors that can occur while building kitchen views.
#[derive(Debug, Error)]
pub enum KitchenError {
    /// Loading the orders failed.
    #[error(transparent)]
    Orders(#[from] DomainError),

    /// A dish or customer lookup failed.
    #[error("Lookup failed: {0}")]
    Lookup(#[from] CatalogError),
}

impl KitchenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KitchenError::Orders(e) => e.kind(),
            KitchenError::Lookup(_) => ErrorKind::Dependency,
        }
    }
}

/// Result type for kitchen operations.
pub type Result<T> = std::result::Result<T, KitchenError>;
