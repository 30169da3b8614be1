//! The order entity.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, OrderId, OrderNumber};
use order_store::{StoreError, StoredOrder, Version};
use serde::Serialize;

use super::{
    Money, OrderChange, OrderError, OrderItem, OrderStatus, OrderUpdatedData, StatusChangedData,
    Transition, total_of, validate_items,
};

/// A customer order for one delivery Friday.
///
/// `total_amount` is always the sum of the line totals; it is recomputed
/// whenever the items change and never accepted from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    customer_id: CustomerId,
    order_date: DateTime<Utc>,
    delivery_date: NaiveDate,
    status: OrderStatus,
    items: Vec<OrderItem>,
    total_amount: Money,
    notes: Option<String>,
    version: Version,
    updated_at: DateTime<Utc>,
}

/// Validated replacement values for an edit.
#[derive(Debug, Clone, Default)]
pub struct OrderEdit {
    pub delivery_date: Option<NaiveDate>,
    pub items: Option<Vec<OrderItem>>,
    pub notes: Option<Option<String>>,
}

impl Order {
    /// Rebuilds an order from its stored form.
    pub fn from_record(record: StoredOrder) -> Result<Self, StoreError> {
        let status: OrderStatus = record.status.parse().map_err(|e: OrderError| {
            StoreError::InvalidRecord(format!("order {}: {e}", record.id))
        })?;
        let items: Vec<OrderItem> = serde_json::from_value(record.items)?;

        Ok(Self {
            id: record.id,
            order_number: record.order_number,
            customer_id: record.customer_id,
            order_date: record.order_date,
            delivery_date: record.delivery_date,
            status,
            total_amount: Money::from_cents(record.total_cents),
            items,
            notes: record.notes,
            version: record.version,
            updated_at: record.updated_at,
        })
    }

    /// Converts to the stored form, carrying the loaded version as the
    /// expected one.
    pub fn to_record(&self) -> Result<StoredOrder, serde_json::Error> {
        Ok(StoredOrder {
            id: self.id,
            version: self.version,
            order_number: self.order_number,
            customer_id: self.customer_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            status: self.status.as_str().to_string(),
            items: serde_json::to_value(&self.items)?,
            total_cents: self.total_amount.cents(),
            notes: self.notes.clone(),
            updated_at: self.updated_at,
        })
    }

    // Accessors

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> OrderNumber {
        self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // Mutations

    /// Moves the order to `requested`.
    ///
    /// Returns the change to record, or None when the order already is in
    /// that status.
    pub fn transition(&mut self, requested: OrderStatus) -> Result<Option<OrderChange>, OrderError> {
        match self.status.transition_to(requested)? {
            Transition::Unchanged => Ok(None),
            Transition::Changed { previous, new } => {
                self.status = new;
                Ok(Some(OrderChange::StatusChanged(StatusChangedData {
                    previous_status: previous,
                    new_status: new,
                })))
            }
        }
    }

    /// Applies an edit to delivery date, items or notes.
    ///
    /// Items of dishes already on the order keep their name and price
    /// snapshot. Returns None if nothing actually changed.
    pub fn edit(&mut self, edit: OrderEdit) -> Result<Option<OrderChange>, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::TerminalState {
                status: self.status,
                action: "edit",
            });
        }

        let items = match edit.items {
            Some(items) => {
                let items = self.freeze_snapshots(items);
                validate_items(&items)?;
                let total = total_of(&items)?;
                Some((items, total))
            }
            None => None,
        };

        let mut changed_fields = Vec::new();
        let previous_delivery_date = self.delivery_date;
        let previous_total = self.total_amount;

        if let Some(date) = edit.delivery_date
            && date != self.delivery_date
        {
            self.delivery_date = date;
            changed_fields.push("deliveryDate".to_string());
        }

        if let Some((items, total)) = items
            && items != self.items
        {
            self.total_amount = total;
            self.items = items;
            changed_fields.push("items".to_string());
        }

        if let Some(notes) = edit.notes
            && notes != self.notes
        {
            self.notes = notes;
            changed_fields.push("notes".to_string());
        }

        if changed_fields.is_empty() {
            return Ok(None);
        }

        let date_changed = previous_delivery_date != self.delivery_date;
        Ok(Some(OrderChange::Updated(OrderUpdatedData {
            changed_fields,
            previous_delivery_date: date_changed.then_some(previous_delivery_date),
            new_delivery_date: date_changed.then_some(self.delivery_date),
            previous_total,
            new_total: self.total_amount,
        })))
    }

    /// Checks whether the order may be deleted.
    pub fn ensure_deletable(&self) -> Result<(), OrderError> {
        if self.status.can_delete() {
            Ok(())
        } else {
            Err(OrderError::TerminalState {
                status: self.status,
                action: "delete",
            })
        }
    }

    fn freeze_snapshots(&self, items: Vec<OrderItem>) -> Vec<OrderItem> {
        items
            .into_iter()
            .map(|mut item| {
                if let Some(existing) = self.items.iter().find(|e| e.dish_id == item.dish_id) {
                    item.price = existing.price;
                    item.dish_name = existing.dish_name.clone();
                }
                item
            })
            .collect()
    }
}
