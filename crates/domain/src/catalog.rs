//! Read models owned by other parts of the system.
//!
//! Dishes and customers are maintained elsewhere; the order engine only
//! looks them up. [`DishCatalog`] and [`CustomerDirectory`] are the seams,
//! with in-memory implementations for tests and the database-less server.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, DishId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::DomainError;
use crate::order::{ItemRequest, Money, OrderItem};

/// Menu category, in kitchen display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DishCategory {
    Appetizer,
    Main,
    Side,
    Dessert,
    Beverage,
    #[default]
    Other,
}

impl DishCategory {
    pub const ALL: [DishCategory; 6] = [
        DishCategory::Appetizer,
        DishCategory::Main,
        DishCategory::Side,
        DishCategory::Dessert,
        DishCategory::Beverage,
        DishCategory::Other,
    ];

    /// Position in the kitchen display order.
    pub fn display_rank(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DishCategory::Appetizer => "appetizer",
            DishCategory::Main => "main",
            DishCategory::Side => "side",
            DishCategory::Dessert => "dessert",
            DishCategory::Beverage => "beverage",
            DishCategory::Other => "other",
        }
    }

    /// Maps a free-form category label, falling back to `Other`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for DishCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DishCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appetizer" | "appetizers" | "starter" => Ok(DishCategory::Appetizer),
            "main" | "mains" | "main course" => Ok(DishCategory::Main),
            "side" | "sides" => Ok(DishCategory::Side),
            "dessert" | "desserts" => Ok(DishCategory::Dessert),
            "beverage" | "beverages" | "drink" | "drinks" => Ok(DishCategory::Beverage),
            "other" => Ok(DishCategory::Other),
            other => Err(format!("unknown dish category: {other}")),
        }
    }
}

/// A dish as the catalog currently describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    pub category: DishCategory,

    /// Current unit price. Orders snapshot it at creation.
    pub price: Money,
}

impl Dish {
    pub fn new(name: impl Into<String>, category: DishCategory, price: Money) -> Self {
        Self {
            id: DishId::new(),
            name: name.into(),
            category,
            price,
        }
    }
}

/// A collaborator lookup failed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{source_name} unavailable: {source}")]
    Unavailable {
        source_name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CatalogError {
    pub fn unavailable(
        source_name: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CatalogError::Unavailable {
            source_name,
            source: source.into(),
        }
    }
}

/// Read access to dishes.
#[async_trait]
pub trait DishCatalog: Send + Sync {
    /// Loads a dish. Returns None if it doesn't exist.
    async fn get_dish(&self, id: DishId) -> Result<Option<Dish>, CatalogError>;

    /// Loads several dishes; missing ids are simply absent from the map.
    async fn get_dishes(&self, ids: &[DishId]) -> Result<HashMap<DishId, Dish>, CatalogError> {
        let mut dishes = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(dish) = self.get_dish(*id).await? {
                dishes.insert(*id, dish);
            }
        }
        Ok(dishes)
    }
}

/// Read access to customers.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Returns the customer's display name, or None for unknown customers.
    async fn customer_name(&self, id: CustomerId) -> Result<Option<String>, CatalogError>;

    /// Resolves several names; unknown ids are absent from the map.
    async fn customer_names(
        &self,
        ids: &[CustomerId],
    ) -> Result<HashMap<CustomerId, String>, CatalogError> {
        let mut names = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(name) = self.customer_name(*id).await? {
                names.insert(*id, name);
            }
        }
        Ok(names)
    }
}

/// In-memory dish catalog.
#[derive(Clone, Default)]
pub struct InMemoryDishCatalog {
    dishes: Arc<RwLock<HashMap<DishId, Dish>>>,
}

impl InMemoryDishCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a dish.
    pub async fn insert(&self, dish: Dish) {
        self.dishes.write().await.insert(dish.id, dish);
    }

    /// Changes a dish's current price. Returns false for unknown dishes.
    pub async fn set_price(&self, id: DishId, price: Money) -> bool {
        match self.dishes.write().await.get_mut(&id) {
            Some(dish) => {
                dish.price = price;
                true
            }
            None => false,
        }
    }

    /// Removes a dish from the catalog.
    pub async fn remove(&self, id: DishId) -> Option<Dish> {
        self.dishes.write().await.remove(&id)
    }
}

#[async_trait]
impl DishCatalog for InMemoryDishCatalog {
    async fn get_dish(&self, id: DishId) -> Result<Option<Dish>, CatalogError> {
        Ok(self.dishes.read().await.get(&id).cloned())
    }

    async fn get_dishes(&self, ids: &[DishId]) -> Result<HashMap<DishId, Dish>, CatalogError> {
        let dishes = self.dishes.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| dishes.get(id).map(|d| (*id, d.clone())))
            .collect())
    }
}

/// In-memory customer directory.
#[derive(Clone, Default)]
pub struct InMemoryCustomerDirectory {
    names: Arc<RwLock<HashMap<CustomerId, String>>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer and returns its id.
    pub async fn add(&self, name: impl Into<String>) -> CustomerId {
        let id = CustomerId::new();
        self.insert(id, name).await;
        id
    }

    pub async fn insert(&self, id: CustomerId, name: impl Into<String>) {
        self.names.write().await.insert(id, name.into());
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn customer_name(&self, id: CustomerId) -> Result<Option<String>, CatalogError> {
        Ok(self.names.read().await.get(&id).cloned())
    }
}

/// Turns item requests into priced line items.
///
/// Prices and names come from the request when given. Otherwise dishes
/// already on the order (`frozen`) keep their snapshot, and anything else is
/// looked up in the catalog at its current price. Unknown dishes fail with
/// `NotFound`.
pub async fn price_items(
    catalog: &dyn DishCatalog,
    requests: Vec<ItemRequest>,
    frozen: &[OrderItem],
) -> Result<Vec<OrderItem>, DomainError> {
    let snapshot = |id: DishId| frozen.iter().find(|item| item.dish_id == id);

    let lookup: Vec<DishId> = requests
        .iter()
        .filter(|r| !(r.price.is_some() && r.dish_name.is_some()))
        .filter(|r| snapshot(r.dish_id).is_none())
        .map(|r| r.dish_id)
        .collect();
    let dishes = if lookup.is_empty() {
        HashMap::new()
    } else {
        catalog.get_dishes(&lookup).await?
    };

    requests
        .into_iter()
        .map(|request| {
            let (name, price) = match (request.dish_name, request.price) {
                (Some(name), Some(price)) => (name, price),
                (name, price) => {
                    let (known_name, known_price) = if let Some(item) = snapshot(request.dish_id) {
                        (item.dish_name.clone(), item.price)
                    } else if let Some(dish) = dishes.get(&request.dish_id) {
                        (dish.name.clone(), dish.price)
                    } else {
                        return Err(DomainError::not_found("dish", request.dish_id));
                    };
                    (name.unwrap_or(known_name), price.unwrap_or(known_price))
                }
            };
            Ok(OrderItem {
                dish_id: request.dish_id,
                dish_name: name,
                quantity: request.quantity,
                price,
                notes: request.notes,
            })
        })
        .collect()
}
