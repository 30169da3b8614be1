//! Prometheus metrics endpoint and recorder setup.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Buckets for the kitchen aggregation histogram, in seconds.
const AGGREGATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Installs the global Prometheus recorder and describes the order metrics.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("kitchen_aggregation_duration_seconds".to_string()),
            AGGREGATION_BUCKETS,
        )?
        .install_recorder()?;

    metrics::describe_counter!("orders_created_total", "Orders created");
    metrics::describe_counter!(
        "order_status_transitions_total",
        "Status changes, labelled by from and to"
    );
    metrics::describe_counter!("orders_deleted_total", "Orders deleted");
    metrics::describe_counter!(
        "order_write_conflicts_total",
        "Writes that lost an optimistic concurrency race"
    );
    metrics::describe_counter!(
        "order_operation_timeouts_total",
        "Operations aborted by the operation timeout"
    );
    metrics::describe_histogram!(
        "kitchen_aggregation_duration_seconds",
        metrics::Unit::Seconds,
        "Time to build the kitchen batch view"
    );

    Ok(handle)
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
