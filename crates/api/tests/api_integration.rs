//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use domain::{
    CustomerId, Dish, DishCategory, InMemoryCustomerDirectory, InMemoryDishCatalog, Money,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const FRIDAY: &str = "2024-03-15";
const THURSDAY: &str = "2024-03-14";

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            api::routes::metrics::install_recorder().expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryOrderStore>>,
    dishes: InMemoryDishCatalog,
    customer: CustomerId,
    other_customer: CustomerId,
    goulash: Dish,
    soup: Dish,
}

async fn setup() -> TestApp {
    let (state, dishes, customers): (_, InMemoryDishCatalog, InMemoryCustomerDirectory) =
        api::create_default_state(InMemoryOrderStore::new(), &Config::default());

    let goulash = Dish::new("Goulash", DishCategory::Main, Money::from_units(42));
    let soup = Dish::new("Soup", DishCategory::Appetizer, Money::from_cents(650));
    dishes.insert(goulash.clone()).await;
    dishes.insert(soup.clone()).await;
    let customer = customers.add("Anna").await;
    let other_customer = customers.add("Ben").await;

    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        dishes,
        customer,
        other_customer,
        goulash,
        soup,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

impl TestApp {
    async fn create_order(&self, customer: CustomerId, quantity: u32) -> Value {
        let response = send(
            &self.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": customer,
                "deliveryDate": FRIDAY,
                "items": [{"dishId": self.goulash.id, "quantity": quantity}],
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn set_status(&self, id: &str, status: &str) -> Response {
        send(
            &self.app,
            "PUT",
            &format!("/orders/{id}/status"),
            Some(json!({ "status": status })),
        )
        .await
    }
}

mod infrastructure {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let t = setup().await;

        let response = send(&t.app, "GET", "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let t = setup().await;
        t.create_order(t.customer, 1).await;

        let response = send(&t.app, "GET", "/metrics", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_create_order() {
        let t = setup().await;

        let order = t.create_order(t.customer, 2).await;

        assert_eq!(order["status"], "NEW");
        assert_eq!(order["deliveryDate"], FRIDAY);
        assert_eq!(order["totalAmount"], 8400);
        assert_eq!(order["items"][0]["dishName"], "Goulash");
        assert_eq!(order["items"][0]["price"], 4200);
        let number = order["orderNumber"].as_str().unwrap();
        assert!(number.starts_with("ORD-"));
        assert!(number.ends_with("-0001"));
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let t = setup().await;

        let first = t.create_order(t.customer, 1).await;
        let second = t.create_order(t.other_customer, 1).await;

        let first = first["orderNumber"].as_str().unwrap().to_string();
        let second = second["orderNumber"].as_str().unwrap().to_string();
        assert!(first.ends_with("-0001"));
        assert!(second.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_create_rejects_non_friday() {
        let t = setup().await;

        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": t.customer,
                "deliveryDate": THURSDAY,
                "items": [{"dishId": t.goulash.id, "quantity": 1}],
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "VALIDATION");
        assert!(body["error"].as_str().unwrap().contains("Friday"));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_customer() {
        let t = setup().await;

        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": CustomerId::new(),
                "deliveryDate": FRIDAY,
                "items": [{"dishId": t.goulash.id, "quantity": 1}],
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_rejects_prices_that_overflow_the_total() {
        let t = setup().await;

        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": t.customer,
                "deliveryDate": FRIDAY,
                "items": [{
                    "dishId": t.goulash.id,
                    "dishName": "Goulash",
                    "quantity": 4,
                    "price": 4_611_686_018_427_387_904_i64,
                }],
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "VALIDATION");
        assert!(body["error"].as_str().unwrap().contains("Invalid price"));

        let item = json!({
            "dishId": t.goulash.id,
            "dishName": "Goulash",
            "quantity": u32::MAX,
            "price": 100_000_000,
        });
        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": t.customer,
                "deliveryDate": FRIDAY,
                "items": vec![item; 30],
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Order total is too large");

        let listed = json_body(send(&t.app, "GET", "/orders", None).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_items() {
        let t = setup().await;

        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": t.customer,
                "deliveryDate": FRIDAY,
                "items": [],
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let t = setup().await;

        let response = send(
            &t.app,
            "POST",
            "/orders",
            Some(json!({ "customerId": "not-a-uuid" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_get_order() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();

        let response = send(&t.app, "GET", &format!("/orders/{id}"), None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);
    }

    #[tokio::test]
    async fn test_get_unknown_and_invalid_ids() {
        let t = setup().await;

        let missing = uuid::Uuid::new_v4();
        let response = send(&t.app, "GET", &format!("/orders/{missing}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&t.app, "GET", "/orders/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_catalog_change() {
        let t = setup().await;
        let created = t.create_order(t.customer, 2).await;
        let id = created["id"].as_str().unwrap();

        t.dishes
            .set_price(t.goulash.id, Money::from_units(50))
            .await;

        let response = send(&t.app, "GET", &format!("/orders/{id}"), None).await;
        assert_eq!(json_body(response).await["totalAmount"], 8400);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let t = setup().await;
        let first = t.create_order(t.customer, 1).await;
        t.create_order(t.other_customer, 1).await;
        t.set_status(first["id"].as_str().unwrap(), "confirmed")
            .await;

        let response = send(&t.app, "GET", "/orders", None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

        let response = send(&t.app, "GET", "/orders?status=CONFIRMED,PREPARING", None).await;
        let confirmed = json_body(response).await;
        assert_eq!(confirmed.as_array().unwrap().len(), 1);
        assert_eq!(confirmed[0]["id"], first["id"]);

        let uri = format!("/orders?customer_id={}", t.other_customer);
        let response = send(&t.app, "GET", &uri, None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = send(&t.app, "GET", "/orders?delivery_date=2024-03-22", None).await;
        assert!(json_body(response).await.as_array().unwrap().is_empty());

        let response = send(&t.app, "GET", "/orders?limit=1&offset=1", None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = send(&t.app, "GET", "/orders?status=SHIPPED", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_order() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();

        let response = send(
            &t.app,
            "PATCH",
            &format!("/orders/{id}"),
            Some(json!({
                "deliveryDate": "2024-03-22",
                "notes": "ring twice",
                "items": [
                    {"dishId": t.goulash.id, "quantity": 1},
                    {"dishId": t.soup.id, "quantity": 2},
                ],
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let order = json_body(response).await;
        assert_eq!(order["deliveryDate"], "2024-03-22");
        assert_eq!(order["notes"], "ring twice");
        assert_eq!(order["totalAmount"], 4200 + 2 * 650);

        let response = send(
            &t.app,
            "PATCH",
            &format!("/orders/{id}"),
            Some(json!({ "deliveryDate": "2024-03-21" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod status {
    use super::*;

    #[tokio::test]
    async fn test_status_change_and_history() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();

        let response = t.set_status(id, "CONFIRMED").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "CONFIRMED");

        // Same status again: no new history entry.
        let response = t.set_status(id, "confirmed").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&t.app, "GET", &format!("/orders/{id}/history"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let history = json_body(response).await;
        let actions: Vec<_> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(actions, vec!["STATUS_CHANGED", "CREATED"]);
    }

    #[tokio::test]
    async fn test_unknown_status_token() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;

        let response = t.set_status(created["id"].as_str().unwrap(), "SHIPPED").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_terminal_orders_reject_changes() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();
        t.set_status(id, "CANCELLED").await;

        let response = t.set_status(id, "CONFIRMED").await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["kind"], "TERMINAL_STATE");

        let response = send(
            &t.app,
            "PATCH",
            &format!("/orders/{id}"),
            Some(json!({ "notes": "too late" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let t = setup().await;
        let missing = uuid::Uuid::new_v4();

        let response = t.set_status(&missing.to_string(), "CONFIRMED").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&t.app, "GET", &format!("/orders/{missing}/history"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn test_delete_delivered_fails() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();
        t.set_status(id, "DELIVERED").await;

        let response = send(&t.app, "DELETE", &format!("/orders/{id}"), None).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["kind"], "TERMINAL_STATE");
    }

    #[tokio::test]
    async fn test_delete_removes_order_and_history() {
        let t = setup().await;
        let created = t.create_order(t.customer, 1).await;
        let id = created["id"].as_str().unwrap();
        t.set_status(id, "CONFIRMED").await;

        let response = send(&t.app, "DELETE", &format!("/orders/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&t.app, "GET", &format!("/orders/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(t.state.orders.store().history_count().await, 0);
    }
}

mod scheduling {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::*;

    #[tokio::test]
    async fn test_delivery_dates() {
        let t = setup().await;

        let response = send(&t.app, "GET", "/delivery-dates?count=3", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let dates: Vec<NaiveDate> = serde_json::from_value(body["dates"].clone()).unwrap();
        assert_eq!(dates.len(), 3);
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Fri));
        assert_eq!((dates[1] - dates[0]).num_days(), 7);
        assert_eq!(body["nextDeliveryDate"], body["dates"][0]);
    }

    #[tokio::test]
    async fn test_delivery_dates_count_bounds() {
        let t = setup().await;

        let response = send(&t.app, "GET", "/delivery-dates", None).await;
        let body = json_body(response).await;
        assert_eq!(body["dates"].as_array().unwrap().len(), 4);

        let response = send(&t.app, "GET", "/delivery-dates?count=0", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod kitchen {
    use super::*;

    #[tokio::test]
    async fn test_batch_sums_quantities() {
        let t = setup().await;
        for customer in [t.customer, t.other_customer] {
            let order = t.create_order(customer, 2).await;
            t.set_status(order["id"].as_str().unwrap(), "CONFIRMED")
                .await;
        }
        // Not yet confirmed: excluded by default.
        t.create_order(t.customer, 5).await;

        let uri = format!("/kitchen/batch?date={FRIDAY}");
        let response = send(&t.app, "GET", &uri, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let batch = json_body(response).await;
        assert_eq!(batch.as_array().unwrap().len(), 1);
        assert_eq!(batch[0]["dishName"], "Goulash");
        assert_eq!(batch[0]["totalQuantity"], 4);
        assert_eq!(batch[0]["orderCount"], 2);
        assert_eq!(batch[0]["contributions"][0]["customerName"], "Anna");

        let uri = format!("/kitchen/batch?date={FRIDAY}&status=NEW,CONFIRMED");
        let response = send(&t.app, "GET", &uri, None).await;
        assert_eq!(json_body(response).await[0]["totalQuantity"], 9);
    }

    #[tokio::test]
    async fn test_grouped_batch() {
        let t = setup().await;
        let order = t.create_order(t.customer, 3).await;
        t.set_status(order["id"].as_str().unwrap(), "PREPARING")
            .await;

        let uri = format!("/kitchen/batch?date={FRIDAY}&grouped=true");
        let response = send(&t.app, "GET", &uri, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let batches = json_body(response).await;
        assert_eq!(batches[0]["category"], "main");
        assert_eq!(batches[0]["totalQuantity"], 3);
        assert_eq!(batches[0]["dishes"][0]["dishName"], "Goulash");
    }

    #[tokio::test]
    async fn test_batch_rejects_bad_input() {
        let t = setup().await;

        let response = send(&t.app, "GET", "/kitchen/batch?date=friday", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let uri = format!("/kitchen/batch?date={FRIDAY}&status=LOST");
        let response = send(&t.app, "GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod memory_mode {
    use api::seed::Seed;

    use super::*;

    async fn place(app: &axum::Router, customer: CustomerId, dish: domain::DishId) -> Response {
        send(
            app,
            "POST",
            "/orders",
            Some(json!({
                "customerId": customer,
                "deliveryDate": FRIDAY,
                "items": [{"dishId": dish, "quantity": 2}],
            })),
        )
        .await
    }

    #[tokio::test]
    async fn test_demo_data_accepts_orders() {
        let state = api::create_memory_state(&Config::default()).await.unwrap();
        let app = api::create_app(state, get_metrics_handle());
        let seed = Seed::demo().unwrap();
        let dish = &seed.dishes[1];

        let response = place(&app, seed.customers[0].id, dish.id).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let order = json_body(response).await;
        assert_eq!(order["totalAmount"], dish.price.cents() * 2);
        assert_eq!(order["items"][0]["dishName"], dish.name.as_str());
    }

    #[tokio::test]
    async fn test_seed_file_replaces_demo_data() {
        let customer = CustomerId::new();
        let dish = Dish::new("Pierogi", DishCategory::Main, Money::from_cents(1800));
        let path = std::env::temp_dir().join(format!("seed-{}.json", uuid::Uuid::new_v4()));
        let seed = json!({
            "customers": [{"id": customer, "name": "Dora"}],
            "dishes": [&dish],
        });
        tokio::fs::write(&path, seed.to_string()).await.unwrap();

        let config = Config {
            seed_file: Some(path.clone()),
            ..Config::default()
        };
        let state = api::create_memory_state(&config).await.unwrap();
        let app = api::create_app(state, get_metrics_handle());
        tokio::fs::remove_file(&path).await.unwrap();

        let response = place(&app, customer, dish.id).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["totalAmount"], 3600);

        let demo = Seed::demo().unwrap();
        let response = place(&app, demo.customers[0].id, dish.id).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreadable_seed_file_fails_startup() {
        let config = Config {
            seed_file: Some("/nonexistent/seed.json".into()),
            ..Config::default()
        };

        let result = api::create_memory_state(&config).await;

        assert!(matches!(result, Err(api::seed::SeedError::Io { .. })));
    }
}
