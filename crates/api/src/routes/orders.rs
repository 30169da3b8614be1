//! Order CRUD, status and history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use domain::{
    CreateOrder, CustomerId, ItemRequest, Order, OrderFilter, OrderHistoryEntry, OrderId,
    OrderStatus, UpdateOrder,
};
use order_store::OrderStore;
use serde::{Deserialize, Deserializer};

use crate::AppState;
use crate::error::ApiError;

/// Hard cap on `limit` for listings.
pub const MAX_PAGE_SIZE: usize = 500;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub delivery_date: Option<NaiveDate>,
    /// Comma-separated status list, e.g. `CONFIRMED,PREPARING`.
    pub status: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub delivery_date: Option<NaiveDate>,
    pub items: Option<Vec<ItemRequest>>,

    /// `null` clears the notes, an absent field leaves them alone.
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

impl From<UpdateOrderRequest> for UpdateOrder {
    fn from(req: UpdateOrderRequest) -> Self {
        UpdateOrder {
            delivery_date: req.delivery_date,
            items: req.items,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// -- Handlers --

/// POST /orders: create an order for the given Friday.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(cmd) = payload?;
    let order = state.orders.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: list orders, oldest order number first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let Query(params) = params?;

    let mut filter = OrderFilter::new();
    if let Some(date) = params.delivery_date {
        filter = filter.delivery_date(date);
    }
    if let Some(raw) = params.status.as_deref() {
        let statuses = OrderStatus::parse_list(raw)?;
        if !statuses.is_empty() {
            filter = filter.statuses(statuses);
        }
    }
    if let Some(customer_id) = params.customer_id {
        filter = filter.customer_id(customer_id);
    }
    if let Some(limit) = params.limit {
        filter = filter.limit(limit.min(MAX_PAGE_SIZE));
    }
    if let Some(offset) = params.offset {
        filter = filter.offset(offset);
    }

    Ok(Json(state.orders.list_orders(filter).await?))
}

/// GET /orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {id}")))?;
    Ok(Json(order))
}

/// PATCH /orders/{id}: edit delivery date, items or notes.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let order = state.orders.update_order(id, req.into()).await?;
    Ok(Json(order))
}

/// PUT /orders/{id}/status: move an order to another status.
#[tracing::instrument(skip(state, payload))]
pub async fn set_status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let status: OrderStatus = req.status.parse()?;
    let order = state.orders.update_order_status(id, status).await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}: delete an order and its history.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/{id}/history: audit trail, newest first.
#[tracing::instrument(skip(state))]
pub async fn history<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Vec<OrderHistoryEntry>>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.orders.get_history(id).await?))
}
