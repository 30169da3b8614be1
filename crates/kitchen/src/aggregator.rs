//! Per-dish aggregation of the orders due on one delivery day.

use std::collections::HashMap;

use common::{CustomerId, DishId, OrderId, OrderNumber};
use domain::{Dish, DishCategory, Order};
use serde::Serialize;

/// How much of one dish the kitchen has to cook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DishAggregate {
    pub dish_id: DishId,
    pub dish_name: String,
    pub category: DishCategory,

    /// Portions across all qualifying orders.
    pub total_quantity: u64,

    /// Distinct orders containing the dish.
    pub order_count: usize,

    /// Who gets how many portions, with their special instructions.
    pub contributions: Vec<OrderContribution>,
}

/// One order's share of a [`DishAggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContribution {
    pub order_id: OrderId,
    pub order_number: OrderNumber,

    /// None when the customer directory no longer knows the customer.
    pub customer_name: Option<String>,

    pub quantity: u64,

    /// Item and order notes, joined.
    pub notes: Option<String>,
}

/// The dishes of one category with their subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBatch {
    pub category: DishCategory,
    pub total_quantity: u64,
    pub dishes: Vec<DishAggregate>,
}

/// Builds the batch-cooking view from already filtered orders.
///
/// Dishes missing from `dishes` keep the name snapshotted on the order and
/// fall into the `other` category. The result is sorted by category display
/// order, then by total quantity descending, then by name.
pub fn aggregate_for_delivery(
    orders: &[Order],
    dishes: &HashMap<DishId, Dish>,
    customer_names: &HashMap<CustomerId, String>,
) -> Vec<DishAggregate> {
    let mut by_dish: HashMap<DishId, DishAggregate> = HashMap::new();

    for order in orders {
        for item in order.items() {
            let aggregate = by_dish.entry(item.dish_id).or_insert_with(|| {
                let (dish_name, category) = match dishes.get(&item.dish_id) {
                    Some(dish) => (dish.name.clone(), dish.category),
                    None => (item.dish_name.clone(), DishCategory::Other),
                };
                DishAggregate {
                    dish_id: item.dish_id,
                    dish_name,
                    category,
                    total_quantity: 0,
                    order_count: 0,
                    contributions: Vec::new(),
                }
            });

            let quantity = u64::from(item.quantity);
            let notes = special_instructions(item.notes.as_deref(), order.notes());
            aggregate.total_quantity += quantity;

            // Same dish twice on one order: fold into its contribution.
            if let Some(last) = aggregate.contributions.last_mut()
                && last.order_id == order.id()
            {
                last.quantity += quantity;
                last.notes = merge_notes(last.notes.take(), item.notes.as_deref());
                continue;
            }

            aggregate.order_count += 1;
            aggregate.contributions.push(OrderContribution {
                order_id: order.id(),
                order_number: order.order_number(),
                customer_name: customer_names.get(&order.customer_id()).cloned(),
                quantity,
                notes,
            });
        }
    }

    let mut aggregates: Vec<DishAggregate> = by_dish.into_values().collect();
    aggregates.sort_by(|a, b| {
        a.category
            .display_rank()
            .cmp(&b.category.display_rank())
            .then_with(|| b.total_quantity.cmp(&a.total_quantity))
            .then_with(|| a.dish_name.cmp(&b.dish_name))
            .then_with(|| a.dish_id.cmp(&b.dish_id))
    });
    aggregates
}

/// Groups sorted aggregates per category, keeping their order.
pub fn group_by_category(aggregates: Vec<DishAggregate>) -> Vec<CategoryBatch> {
    let mut batches: Vec<CategoryBatch> = Vec::new();
    for aggregate in aggregates {
        match batches.last_mut() {
            Some(batch) if batch.category == aggregate.category => {
                batch.total_quantity += aggregate.total_quantity;
                batch.dishes.push(aggregate);
            }
            _ => batches.push(CategoryBatch {
                category: aggregate.category,
                total_quantity: aggregate.total_quantity,
                dishes: vec![aggregate],
            }),
        }
    }
    batches
}

fn special_instructions(item_notes: Option<&str>, order_notes: Option<&str>) -> Option<String> {
    merge_notes(item_notes.map(str::to_string), order_notes)
}

fn merge_notes(existing: Option<String>, extra: Option<&str>) -> Option<String> {
    let extra = extra.map(str::trim).filter(|n| !n.is_empty());
    let existing = existing.filter(|n| !n.trim().is_empty());
    match (existing, extra) {
        (Some(existing), Some(extra))
            if existing.split("; ").any(|note| note.trim() == extra) =>
        {
            Some(existing)
        }
        (Some(existing), Some(extra)) => Some(format!("{existing}; {extra}")),
        (Some(existing), None) => Some(existing),
        (None, Some(extra)) => Some(extra.to_string()),
        (None, None) => None,
    }
}
