//! PostgreSQL read models for dishes and customers.
//!
//! Both tables belong to the CRUD application; this crate only reads them.

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    CatalogError, CustomerDirectory, CustomerId, Dish, DishCatalog, DishCategory, DishId, Money,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

/// Dish catalog backed by the `dishes` table.
#[derive(Clone)]
pub struct PgDishCatalog {
    pool: PgPool,
}

impl PgDishCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_dish(row: PgRow) -> Result<Dish, sqlx::Error> {
        let category: String = row.try_get("category")?;
        Ok(Dish {
            id: DishId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            category: DishCategory::from_label(&category),
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }
}

fn unavailable(source_name: &'static str) -> impl FnOnce(sqlx::Error) -> CatalogError {
    move |e| CatalogError::unavailable(source_name, e)
}

#[async_trait]
impl DishCatalog for PgDishCatalog {
    async fn get_dish(&self, id: DishId) -> Result<Option<Dish>, CatalogError> {
        let row = sqlx::query("SELECT id, name, category, price_cents FROM dishes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable("dishes"))?;

        row.map(Self::row_to_dish)
            .transpose()
            .map_err(unavailable("dishes"))
    }

    async fn get_dishes(&self, ids: &[DishId]) -> Result<HashMap<DishId, Dish>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, name, category, price_cents FROM dishes WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable("dishes"))?;

        rows.into_iter()
            .map(|row| Self::row_to_dish(row).map(|dish| (dish.id, dish)))
            .collect::<Result<_, _>>()
            .map_err(unavailable("dishes"))
    }
}

/// Customer directory backed by the `customers` table.
#[derive(Clone)]
pub struct PgCustomerDirectory {
    pool: PgPool,
}

impl PgCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerDirectory for PgCustomerDirectory {
    async fn customer_name(&self, id: CustomerId) -> Result<Option<String>, CatalogError> {
        sqlx::query_scalar("SELECT name FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable("customers"))
    }

    async fn customer_names(
        &self,
        ids: &[CustomerId],
    ) -> Result<HashMap<CustomerId, String>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query("SELECT id, name FROM customers WHERE id = ANY($1)")
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("customers"))?;

        rows.into_iter()
            .map(|row| -> Result<(CustomerId, String), sqlx::Error> {
                let id = CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?);
                Ok((id, row.try_get("name")?))
            })
            .collect::<Result<_, _>>()
            .map_err(unavailable("customers"))
    }
}
