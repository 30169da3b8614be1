//! Kitchen batch view.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use domain::OrderStatus;
use order_store::OrderStore;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct BatchParams {
    /// Defaults to the next delivery date.
    pub date: Option<NaiveDate>,
    /// Comma-separated statuses; `CONFIRMED,PREPARING` when absent.
    pub status: Option<String>,
    #[serde(default)]
    pub grouped: bool,
}

/// GET /kitchen/batch: how much of each dish to cook for a delivery day.
#[tracing::instrument(skip(state))]
pub async fn batch<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<BatchParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let date = params
        .date
        .unwrap_or_else(|| state.orders.next_delivery_date());
    let statuses = match params.status.as_deref() {
        Some(raw) => Some(OrderStatus::parse_list(raw)?),
        None => None,
    };

    let response = if params.grouped {
        Json(
            state
                .kitchen
                .get_batches_for_date(date, statuses.as_deref())
                .await?,
        )
        .into_response()
    } else {
        Json(
            state
                .kitchen
                .get_aggregated_dishes_for_date(date, statuses.as_deref())
                .await?,
        )
        .into_response()
    };
    Ok(response)
}
