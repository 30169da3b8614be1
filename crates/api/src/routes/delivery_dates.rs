//! Selectable delivery dates.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

pub const DEFAULT_COUNT: usize = 4;
pub const MAX_COUNT: usize = 52;

#[derive(Debug, Deserialize)]
pub struct DeliveryDatesParams {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDatesResponse {
    pub next_delivery_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

/// GET /delivery-dates?count=N: the next N Fridays an order can target.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<DeliveryDatesParams>, QueryRejection>,
) -> Result<Json<DeliveryDatesResponse>, ApiError> {
    let Query(params) = params?;
    let count = params.count.unwrap_or(DEFAULT_COUNT);
    if count == 0 || count > MAX_COUNT {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_COUNT}"
        )));
    }

    Ok(Json(DeliveryDatesResponse {
        next_delivery_date: state.orders.next_delivery_date(),
        dates: state.orders.available_delivery_dates(count),
    }))
}
