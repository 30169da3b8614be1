//! HTTP API server with observability for the order engine.
//!
//! Provides REST endpoints for the order lifecycle, delivery dates and the
//! kitchen batch view, with structured logging (tracing) and Prometheus
//! metrics.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use domain::{
    CustomerDirectory, DishCatalog, InMemoryCustomerDirectory, InMemoryDishCatalog, OrderService,
};
use kitchen::KitchenService;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use seed::{Seed, SeedError};

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore + Clone> {
    pub orders: OrderService<S>,
    pub kitchen: KitchenService<S>,
    /// Store backend label reported by `/health`.
    pub backend: &'static str,
}

impl<S: OrderStore + Clone + 'static> AppState<S> {
    /// Wires the order and kitchen services to one store and one set of
    /// collaborators.
    pub fn new(
        store: S,
        backend: &'static str,
        dishes: Arc<dyn DishCatalog>,
        customers: Arc<dyn CustomerDirectory>,
        config: &Config,
    ) -> Self {
        let orders = OrderService::new(store, dishes.clone(), customers.clone())
            .with_scheduler(config.scheduler())
            .with_config(config.service_config());
        let kitchen = KitchenService::new(orders.clone(), dishes, customers);
        Self {
            orders,
            kitchen,
            backend,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .patch(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .route("/orders/{id}/history", get(routes::orders::history::<S>))
        .route("/delivery-dates", get(routes::delivery_dates::list::<S>))
        .route("/kitchen/batch", get(routes::kitchen::batch::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over `store` with in-memory collaborators.
///
/// The catalog and directory are returned so callers can seed them.
pub fn create_default_state<S: OrderStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> (
    Arc<AppState<S>>,
    InMemoryDishCatalog,
    InMemoryCustomerDirectory,
) {
    let dishes = InMemoryDishCatalog::new();
    let customers = InMemoryCustomerDirectory::new();
    let state = AppState::new(
        store,
        "memory",
        Arc::new(dishes.clone()),
        Arc::new(customers.clone()),
        config,
    );
    (Arc::new(state), dishes, customers)
}

/// Creates the database-less application state.
///
/// The in-memory catalog and directory are filled from `config.seed_file`,
/// or from the bundled demo data when no file is configured.
pub async fn create_memory_state(
    config: &Config,
) -> Result<Arc<AppState<InMemoryOrderStore>>, SeedError> {
    let seed = match config.seed_file.as_deref() {
        Some(path) => Seed::load(path).await?,
        None => Seed::demo()?,
    };
    let (state, dishes, customers) = create_default_state(InMemoryOrderStore::new(), config);
    seed.apply(&dishes, &customers).await;

    let source = config
        .seed_file
        .as_ref()
        .map_or_else(|| "demo".to_string(), |p| p.display().to_string());
    tracing::info!(
        customers = seed.customers.len(),
        dishes = seed.dishes.len(),
        %source,
        "seeded in-memory collaborators"
    );
    Ok(state)
}
