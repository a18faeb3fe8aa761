//! HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Order;
use crate::services::order::{CreateOrderInput, OrderService, UpdateOrderInput};
use crate::AppState;

/// Place an order
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.store, &state.config);
    let order = service.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List orders, newest first
pub async fn list_orders(State(state): State<AppState>) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.store, &state.config);
    let orders = service.list_orders().await?;
    Ok(Json(orders))
}

/// Get an order with its items
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.store, &state.config);
    let order = service.get_order(order_id).await?;
    Ok(Json(order))
}

/// Update status, notes or reseller of an order
pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.store, &state.config);
    let order = service.update_order(order_id, input).await?;
    Ok(Json(order))
}

/// Delete an order
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = OrderService::new(state.store, &state.config);
    service.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel an order and return its stock
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.store, &state.config);
    let order = service.cancel_order(order_id).await?;
    Ok(Json(order))
}
