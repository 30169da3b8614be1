//! Order history entries.
//!
//! Every real change to an order produces exactly one [`OrderChange`], which
//! the store persists as an immutable history record in the same write as
//! the order itself.

use chrono::{DateTime, NaiveDate, Utc};
use common::{HistoryEntryId, OrderId};
use order_store::{HistoryRecord, NewHistory};
use serde::{Deserialize, Serialize};

use super::{Money, OrderStatus};

pub const ACTION_CREATED: &str = "CREATED";
pub const ACTION_STATUS_CHANGED: &str = "STATUS_CHANGED";
pub const ACTION_UPDATED: &str = "UPDATED";

/// Changes recorded in an order's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderChange {
    /// Order was created.
    Created(OrderCreatedData),

    /// Order moved to another status.
    StatusChanged(StatusChangedData),

    /// Delivery date, items or notes were edited.
    Updated(OrderUpdatedData),
}

/// Details of a `CREATED` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedData {
    pub status: OrderStatus,
    pub delivery_date: NaiveDate,
    pub item_count: usize,
    pub total_amount: Money,
}

/// Details of a `STATUS_CHANGED` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedData {
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
}

/// Details of an `UPDATED` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatedData {
    /// Names of the fields that changed, e.g. `deliveryDate`.
    pub changed_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_delivery_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_delivery_date: Option<NaiveDate>,

    pub previous_total: Money,
    pub new_total: Money,
}

impl OrderChange {
    /// The history action tag.
    pub fn action(&self) -> &'static str {
        match self {
            OrderChange::Created(_) => ACTION_CREATED,
            OrderChange::StatusChanged(_) => ACTION_STATUS_CHANGED,
            OrderChange::Updated(_) => ACTION_UPDATED,
        }
    }

    /// The structured payload stored with the entry.
    pub fn details(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            OrderChange::Created(data) => serde_json::to_value(data),
            OrderChange::StatusChanged(data) => serde_json::to_value(data),
            OrderChange::Updated(data) => serde_json::to_value(data),
        }
    }

    /// Builds the entry for a not yet persisted order.
    pub fn to_new_history(&self) -> Result<NewHistory, serde_json::Error> {
        Ok(NewHistory::new(self.action(), self.details()?))
    }

    /// Builds the entry for an existing order, stamped now.
    pub fn to_record(&self, order_id: OrderId) -> Result<HistoryRecord, serde_json::Error> {
        Ok(HistoryRecord::new(order_id, self.action(), self.details()?))
    }

    /// Decodes a persisted entry. Returns None for unknown actions.
    pub fn from_entry(
        action: &str,
        details: &serde_json::Value,
    ) -> Result<Option<Self>, serde_json::Error> {
        let change = match action {
            ACTION_CREATED => OrderChange::Created(serde_json::from_value(details.clone())?),
            ACTION_STATUS_CHANGED => {
                OrderChange::StatusChanged(serde_json::from_value(details.clone())?)
            }
            ACTION_UPDATED => OrderChange::Updated(serde_json::from_value(details.clone())?),
            _ => return Ok(None),
        };
        Ok(Some(change))
    }
}

/// One immutable entry of an order's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryEntry {
    pub id: HistoryEntryId,
    pub order_id: OrderId,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OrderHistoryEntry {
    /// Decodes the entry's payload.
    pub fn change(&self) -> Result<Option<OrderChange>, serde_json::Error> {
        OrderChange::from_entry(&self.action, &self.details)
    }
}

impl From<HistoryRecord> for OrderHistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            action: record.action,
            details: record.details,
            created_at: record.created_at,
        }
    }
}
