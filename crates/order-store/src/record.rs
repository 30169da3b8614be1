use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, HistoryEntryId, OrderId, OrderNumber};

/// Version of a stored order, used for optimistic concurrency control.
///
/// A freshly created order is at version 1 and every successful update
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a newly created order.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// An order as persisted by the store.
///
/// Line items are kept as an opaque JSON document; the domain layer owns
/// their shape. `status` holds the canonical status token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOrder {
    pub id: OrderId,

    /// Expected version when passed to an update; actual version when read.
    pub version: Version,

    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: NaiveDate,
    pub status: String,
    pub items: serde_json::Value,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An order that has not been persisted yet.
///
/// The store assigns the id and order number, and writes `created` as the
/// first history entry, all in one atomic step.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Year whose counter issues the order number.
    pub year: i32,
    pub customer_id: CustomerId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: NaiveDate,
    pub status: String,
    pub items: serde_json::Value,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub created: NewHistory,
}

/// Action and payload of a history entry whose order is not known yet.
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub action: String,
    pub details: serde_json::Value,
}

impl NewHistory {
    pub fn new(action: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            details,
        }
    }

    /// Binds the entry to its order.
    pub fn for_order(self, order_id: OrderId, created_at: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            id: HistoryEntryId::new(),
            order_id,
            action: self.action,
            details: self.details,
            created_at,
        }
    }
}

/// An immutable audit record owned by an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryEntryId,
    pub order_id: OrderId,

    /// Free-form tag such as `CREATED` or `STATUS_CHANGED`.
    pub action: String,

    /// Structured payload describing the change.
    pub details: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Creates a history entry stamped with the current time.
    pub fn new(order_id: OrderId, action: impl Into<String>, details: serde_json::Value) -> Self {
        NewHistory::new(action, details).for_order(order_id, Utc::now())
    }
}
