//! Value objects for the order domain.

use common::DishId;
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new Money amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (remainder after units).
    pub fn cents_part(&self) -> i64 {
        self.0.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a quantity. Returns None on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts. Returns None on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", self.units().abs(), self.cents_part())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// A line item of an order.
///
/// `dish_name` and `price` are snapshots taken when the item was added and
/// never follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub dish_id: DishId,
    pub dish_name: String,

    /// Portions ordered, always greater than zero.
    pub quantity: u32,

    /// Unit price.
    pub price: Money,

    /// Special instructions for this dish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderItem {
    /// Creates a new order item without notes.
    pub fn new(dish_id: DishId, dish_name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            dish_id,
            dish_name: dish_name.into(),
            quantity,
            price,
            notes: None,
        }
    }

    /// Attaches special instructions.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns `quantity * price`, or None if it doesn't fit in an i64.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// Sums the line totals of `items`.
pub fn total_of(items: &[OrderItem]) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        item.line_total()
            .and_then(|line| total.checked_add(line))
            .ok_or(OrderError::AmountOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_units() {
        let money = Money::from_units(42);
        assert_eq!(money.cents(), 4200);
        assert_eq!(money.units(), 42);
        assert_eq!(money.cents_part(), 0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(8400).to_string(), "84.00");
        assert_eq!(Money::from_cents(1205).to_string(), "12.05");
        assert_eq!(Money::from_cents(-50).to_string(), "-0.50");
    }

    #[test]
    fn test_money_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "1999");
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem::new(DishId::new(), "Goulash", 2, Money::from_units(42));
        assert_eq!(item.line_total(), Some(Money::from_units(84)));

        let huge = OrderItem::new(DishId::new(), "Caviar", 4, Money::from_cents(i64::MAX / 2));
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn test_total_of_items() {
        let items = vec![
            OrderItem::new(DishId::new(), "Goulash", 2, Money::from_cents(4200)),
            OrderItem::new(DishId::new(), "Strudel", 3, Money::from_cents(350)),
        ];
        assert_eq!(total_of(&items), Ok(Money::from_cents(9450)));
        assert_eq!(total_of(&[]), Ok(Money::zero()));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let price = Money::from_cents(1 << 62);
        let items = vec![OrderItem::new(DishId::new(), "Caviar", 4, price)];
        assert_eq!(total_of(&items), Err(OrderError::AmountOverflow));

        let items = vec![
            OrderItem::new(DishId::new(), "Caviar", 1, Money::from_cents(i64::MAX)),
            OrderItem::new(DishId::new(), "Bread", 1, Money::from_cents(1)),
        ];
        assert_eq!(total_of(&items), Err(OrderError::AmountOverflow));
    }

    #[test]
    fn test_item_json_shape() {
        let item = OrderItem::new(DishId::new(), "Goulash", 1, Money::from_cents(4200))
            .with_notes("no onions");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["dishName"], "Goulash");
        assert_eq!(json["price"], 4200);
        assert_eq!(json["notes"], "no onions");

        let back: OrderItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
