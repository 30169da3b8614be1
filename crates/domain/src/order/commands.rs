//! Order commands.

use chrono::NaiveDate;
use common::{CustomerId, DishId};
use order_store::OrderQuery;
use serde::Deserialize;

use super::{Money, OrderStatus};

/// A line item as a caller asks for it.
///
/// `dish_name` and `price` may be left out and are then snapshotted from
/// the dish catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub dish_id: DishId,
    #[serde(default)]
    pub dish_name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ItemRequest {
    /// Requests `quantity` portions at the catalog price.
    pub fn new(dish_id: DishId, quantity: u32) -> Self {
        Self {
            dish_id,
            dish_name: None,
            quantity,
            price: None,
            notes: None,
        }
    }

    /// Supplies the name and price snapshot directly.
    pub fn priced(mut self, dish_name: impl Into<String>, price: Money) -> Self {
        self.dish_name = Some(dish_name.into());
        self.price = Some(price);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Command to create a new order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Requested Friday.
    pub delivery_date: NaiveDate,

    pub items: Vec<ItemRequest>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(customer_id: CustomerId, delivery_date: NaiveDate, items: Vec<ItemRequest>) -> Self {
        Self {
            customer_id,
            delivery_date,
            items,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Command to edit an open order. Absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub delivery_date: Option<NaiveDate>,

    /// Replaces the whole item list.
    pub items: Option<Vec<ItemRequest>>,

    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
}

impl UpdateOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn items(mut self, items: Vec<ItemRequest>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    /// True if the command asks for nothing.
    pub fn is_empty(&self) -> bool {
        self.delivery_date.is_none() && self.items.is_none() && self.notes.is_none()
    }
}

/// Criteria for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub delivery_date: Option<NaiveDate>,
    pub statuses: Option<Vec<OrderStatus>>,
    pub customer_id: Option<CustomerId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl From<OrderFilter> for OrderQuery {
    fn from(filter: OrderFilter) -> Self {
        OrderQuery {
            delivery_date: filter.delivery_date,
            statuses: filter
                .statuses
                .map(|s| s.iter().map(|status| status.as_str().to_string()).collect()),
            customer_id: filter.customer_id,
            limit: filter.limit,
            offset: filter.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_from_json() {
        let customer_id = CustomerId::new();
        let dish_id = DishId::new();
        let json = serde_json::json!({
            "customerId": customer_id,
            "deliveryDate": "2024-03-15",
            "items": [
                {"dishId": dish_id, "quantity": 2},
                {"dishId": dish_id, "quantity": 1, "dishName": "Goulash", "price": 4200, "notes": "extra spicy"}
            ],
            "notes": "leave at the door"
        });

        let cmd: CreateOrder = serde_json::from_value(json).unwrap();
        assert_eq!(cmd.customer_id, customer_id);
        assert_eq!(cmd.delivery_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(cmd.items[0], ItemRequest::new(dish_id, 2));
        assert_eq!(
            cmd.items[1],
            ItemRequest::new(dish_id, 1)
                .priced("Goulash", Money::from_cents(4200))
                .with_notes("extra spicy")
        );
        assert_eq!(cmd.notes.as_deref(), Some("leave at the door"));
    }

    #[test]
    fn test_update_order_builder() {
        assert!(UpdateOrder::new().is_empty());
        let cmd = UpdateOrder::new().notes(None);
        assert!(!cmd.is_empty());
        assert_eq!(cmd.notes, Some(None));
    }

    #[test]
    fn test_filter_to_query() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let query: OrderQuery = OrderFilter::new()
            .delivery_date(date)
            .statuses([OrderStatus::Confirmed, OrderStatus::Preparing])
            .limit(10)
            .into();

        assert_eq!(query.delivery_date, Some(date));
        assert_eq!(
            query.statuses,
            Some(vec!["CONFIRMED".to_string(), "PREPARING".to_string()])
        );
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, None);
    }
}
