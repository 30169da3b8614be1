//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use order_store::{
    CustomerId, HistoryRecord, NewHistory, NewOrder, OrderQuery, OrderStore, OrderStoreExt,
    PostgresOrderStore, StoreError, StoredOrder, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_history, orders, order_counters")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn new_order(status: &str) -> NewOrder {
    NewOrder {
        year: 2024,
        customer_id: CustomerId::new(),
        order_date: Utc::now(),
        delivery_date: friday(),
        status: status.to_string(),
        items: serde_json::json!([{"dishName": "Schnitzel", "quantity": 2}]),
        total_cents: 8400,
        notes: Some("ring twice".to_string()),
        created: NewHistory::new("CREATED", serde_json::json!({"itemCount": 1})),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn create_and_load_order() {
    let store = get_test_store().await;

    let created = store.create_order(new_order("NEW")).await.unwrap();
    assert_eq!(created.order_number.to_string(), "ORD-2024-0001");

    let loaded = store.require_order(created.id).await.unwrap();
    assert_eq!(loaded.order_number, created.order_number);
    assert_eq!(loaded.total_cents, 8400);
    assert_eq!(loaded.notes.as_deref(), Some("ring twice"));
    assert_eq!(loaded.version, Version::first());

    let history = store.get_history(created.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, "CREATED");
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn concurrent_creates_get_distinct_numbers() {
    let store = get_test_store().await;

    let results = futures_util::future::join_all(
        (0..20).map(|_| store.create_order(new_order("NEW"))),
    )
    .await;

    let mut sequences: Vec<u32> = results
        .into_iter()
        .map(|r| r.unwrap().order_number.sequence())
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=20).collect::<Vec<_>>());
    assert_eq!(store.counter_value(2024).await.unwrap(), Some(20));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn stale_update_conflicts_and_writes_no_history() {
    let store = get_test_store().await;
    let order = store.create_order(new_order("NEW")).await.unwrap();

    let confirmed = StoredOrder {
        status: "CONFIRMED".to_string(),
        ..order.clone()
    };
    let entry = HistoryRecord::new(order.id, "STATUS_CHANGED", serde_json::json!({}));
    let updated = store.update_order(confirmed, vec![entry]).await.unwrap();
    assert_eq!(updated.version, Version::new(2));

    let entry = HistoryRecord::new(order.id, "STATUS_CHANGED", serde_json::json!({}));
    let result = store.update_order(order.clone(), vec![entry]).await;
    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert_eq!(store.get_history(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn delete_cascades_history() {
    let store = get_test_store().await;
    let order = store.create_order(new_order("CONFIRMED")).await.unwrap();

    store.delete_order(order.id, order.version).await.unwrap();

    assert!(!store.order_exists(order.id).await.unwrap());
    assert!(store.get_history(order.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn query_by_delivery_date_and_status() {
    let store = get_test_store().await;
    store.create_order(new_order("CONFIRMED")).await.unwrap();
    store.create_order(new_order("CANCELLED")).await.unwrap();
    store.create_order(new_order("PREPARING")).await.unwrap();

    let active = store
        .orders_for_delivery(
            friday(),
            vec!["CONFIRMED".to_string(), "PREPARING".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    let first_page = store
        .query_orders(OrderQuery::new().limit(2))
        .await
        .unwrap();
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].order_number.sequence(), 1);
}
