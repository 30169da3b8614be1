//! Domain error types.

use std::time::Duration;

use order_store::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;

/// Coarse error category shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad input; never retried.
    Validation,

    /// A write lost a race and retries were exhausted.
    Conflict,

    /// Unknown order, customer or dish.
    NotFound,

    /// Mutation of a delivered or cancelled order.
    TerminalState,

    /// Store or collaborator unavailable, or the operation timed out.
    Dependency,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TerminalState => "TERMINAL_STATE",
            ErrorKind::Dependency => "DEPENDENCY",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order rule was violated.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// A read-model collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Concurrent writers kept winning until the retry budget ran out.
    #[error("{operation} kept conflicting with concurrent writes, gave up after {attempts} attempts")]
    Conflict {
        operation: &'static str,
        attempts: u32,
    },

    /// The operation did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the error category callers dispatch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(e) => e.kind(),
            DomainError::Store(StoreError::OrderNotFound(_)) => ErrorKind::NotFound,
            DomainError::Store(e) if e.is_retryable() => ErrorKind::Conflict,
            DomainError::Store(_) => ErrorKind::Dependency,
            DomainError::Catalog(_) => ErrorKind::Dependency,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict { .. } => ErrorKind::Conflict,
            DomainError::Timeout { .. } => ErrorKind::Dependency,
            DomainError::Serialization(_) => ErrorKind::Dependency,
        }
    }

    /// Returns true if repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Store(e) if e.is_retryable())
    }
}
