use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CustomerId, HistoryEntryId, HistoryRecord, NewOrder, OrderId, OrderNumber, OrderQuery, Result,
    StoreError, StoredOrder, Version,
    store::{OrderStore, validate_history_for_update},
};

const ORDER_COLUMNS: &str = "id, version, order_number, customer_id, order_date, delivery_date, \
     status, items, total_cents, notes, updated_at";

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<StoredOrder> {
        let order_number: String = row.try_get("order_number")?;
        let order_number = order_number
            .parse::<OrderNumber>()
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

        Ok(StoredOrder {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            version: Version::new(row.try_get("version")?),
            order_number,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            order_date: row.try_get("order_date")?,
            delivery_date: row.try_get("delivery_date")?,
            status: row.try_get("status")?,
            items: row.try_get("items")?,
            total_cents: row.try_get("total_cents")?,
            notes: row.try_get("notes")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_history(row: PgRow) -> Result<HistoryRecord> {
        Ok(HistoryRecord {
            id: HistoryEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            action: row.try_get("action")?,
            details: row.try_get("details")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn increment_counter(tx: &mut Transaction<'_, Postgres>, year: i32) -> Result<u32> {
        // The upsert takes a row lock, so concurrent callers serialize on it.
        let count: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (year, count)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET count = order_counters.count + 1
            RETURNING count
            "#,
        )
        .bind(year)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Self::map_counter_error(e, year))?;

        u32::try_from(count).map_err(|_| {
            StoreError::InvalidRecord(format!("negative order counter {count} for year {year}"))
        })
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        entry: &HistoryRecord,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_history (id, order_id, action, details, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.order_id.as_uuid())
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Explains why a versioned write matched no row.
    async fn version_mismatch(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        expected: Version,
    ) -> StoreError {
        let current: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await;

        match current {
            Ok(Some(actual)) => StoreError::Conflict {
                order_id,
                expected,
                actual: Version::new(actual),
            },
            Ok(None) => StoreError::OrderNotFound(order_id),
            Err(e) => StoreError::Database(e),
        }
    }

    fn map_counter_error(e: sqlx::Error, year: i32) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            )
        {
            return StoreError::CounterContention { year };
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn counter_value(&self, year: i32) -> Result<Option<u32>> {
        let count: Option<i32> =
            sqlx::query_scalar("SELECT count FROM order_counters WHERE year = $1")
                .bind(year)
                .fetch_optional(&self.pool)
                .await?;
        Ok(count.and_then(|c| u32::try_from(c).ok()))
    }

    async fn create_order(&self, order: NewOrder) -> Result<StoredOrder> {
        let mut tx = self.pool.begin().await?;

        let sequence = Self::increment_counter(&mut tx, order.year).await?;
        let order_number = OrderNumber::new(order.year, sequence);
        let id = OrderId::new();

        let stored = StoredOrder {
            id,
            version: Version::first(),
            order_number,
            customer_id: order.customer_id,
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            status: order.status,
            items: order.items,
            total_cents: order.total_cents,
            notes: order.notes,
            updated_at: order.order_date,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (id, version, order_number, order_year, order_sequence, customer_id,
                                order_date, delivery_date, status, items, total_cents, notes, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(stored.id.as_uuid())
        .bind(stored.version.as_i64())
        .bind(stored.order_number.to_string())
        .bind(order.year)
        .bind(sequence as i32)
        .bind(stored.customer_id.as_uuid())
        .bind(stored.order_date)
        .bind(stored.delivery_date)
        .bind(&stored.status)
        .bind(&stored.items)
        .bind(stored.total_cents)
        .bind(&stored.notes)
        .bind(stored.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && matches!(
                    db_err.constraint(),
                    Some("unique_order_number") | Some("unique_order_sequence")
                )
            {
                return StoreError::DuplicateOrderNumber(order_number.to_string());
            }
            StoreError::Database(e)
        })?;

        let created = order.created.for_order(id, stored.order_date);
        Self::insert_history(&mut tx, &created).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<StoredOrder>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Vec<StoredOrder>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.delivery_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND delivery_date = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }

        sql.push_str(" ORDER BY order_year ASC, order_sequence ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(date) = query.delivery_date {
            sqlx_query = sqlx_query.bind(date);
        }
        if let Some(statuses) = query.statuses {
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(customer_id) = query.customer_id {
            sqlx_query = sqlx_query.bind(customer_id.as_uuid());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order(
        &self,
        order: StoredOrder,
        history: Vec<HistoryRecord>,
    ) -> Result<StoredOrder> {
        validate_history_for_update(order.id, &history)?;

        let mut tx = self.pool.begin().await?;

        let row: Option<PgRow> = sqlx::query(
            r#"
            UPDATE orders
            SET customer_id = $3, delivery_date = $4, status = $5, items = $6,
                total_cents = $7, notes = $8, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING version, updated_at
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.version.as_i64())
        .bind(order.customer_id.as_uuid())
        .bind(order.delivery_date)
        .bind(&order.status)
        .bind(&order.items)
        .bind(order.total_cents)
        .bind(&order.notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(Self::version_mismatch(&mut tx, order.id, order.version).await);
        };

        for entry in &history {
            Self::insert_history(&mut tx, entry).await?;
        }

        tx.commit().await?;

        Ok(StoredOrder {
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
            ..order
        })
    }

    async fn delete_order(&self, order_id: OrderId, expected: Version) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_history WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1 AND version = $2")
            .bind(order_id.as_uuid())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Dropping the transaction rolls back the history delete.
            return Err(Self::version_mismatch(&mut tx, order_id, expected).await);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_history(&self, order_id: OrderId) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, action, details, created_at
            FROM order_history
            WHERE order_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }
}
