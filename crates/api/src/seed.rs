//! Reference data for the database-less server mode.
//!
//! Without PostgreSQL the dish catalog and customer directory live in
//! memory. They are filled from `SEED_FILE` when set, or from the bundled
//! demo menu otherwise.

use std::path::Path;

use domain::{CustomerId, Dish, InMemoryCustomerDirectory, InMemoryDishCatalog};
use serde::Deserialize;
use thiserror::Error;

const DEMO_SEED: &str = include_str!("../seed.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedCustomer {
    pub id: CustomerId,
    pub name: String,
}

/// Customers and dishes to preload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub customers: Vec<SeedCustomer>,
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

impl Seed {
    /// The bundled demo menu and customers.
    pub fn demo() -> Result<Self, SeedError> {
        Ok(serde_json::from_str(DEMO_SEED)?)
    }

    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Inserts every customer and dish, replacing entries with the same id.
    pub async fn apply(&self, dishes: &InMemoryDishCatalog, customers: &InMemoryCustomerDirectory) {
        for customer in &self.customers {
            customers.insert(customer.id, customer.name.clone()).await;
        }
        for dish in &self.dishes {
            dishes.insert(dish.clone()).await;
        }
    }
}
