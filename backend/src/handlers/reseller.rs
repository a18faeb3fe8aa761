//! HTTP handlers for reseller endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Reseller, ResellerWithOrders};
use crate::services::reseller::{CreateResellerInput, ResellerService, UpdateResellerInput};
use crate::AppState;

/// Create a reseller
pub async fn create_reseller(
    State(state): State<AppState>,
    Json(input): Json<CreateResellerInput>,
) -> AppResult<(StatusCode, Json<Reseller>)> {
    let service = ResellerService::new(state.store, &state.config);
    let reseller = service.create_reseller(input).await?;
    Ok((StatusCode::CREATED, Json(reseller)))
}

/// List resellers
pub async fn list_resellers(State(state): State<AppState>) -> AppResult<Json<Vec<Reseller>>> {
    let service = ResellerService::new(state.store, &state.config);
    let resellers = service.list_resellers().await?;
    Ok(Json(resellers))
}

/// Get a reseller
pub async fn get_reseller(
    State(state): State<AppState>,
    Path(reseller_id): Path<Uuid>,
) -> AppResult<Json<Reseller>> {
    let service = ResellerService::new(state.store, &state.config);
    let reseller = service.get_reseller(reseller_id).await?;
    Ok(Json(reseller))
}

/// Get a reseller with its orders
pub async fn get_reseller_orders(
    State(state): State<AppState>,
    Path(reseller_id): Path<Uuid>,
) -> AppResult<Json<ResellerWithOrders>> {
    let service = ResellerService::new(state.store, &state.config);
    let reseller = service.get_reseller_with_orders(reseller_id).await?;
    Ok(Json(reseller))
}

/// Update a reseller
pub async fn update_reseller(
    State(state): State<AppState>,
    Path(reseller_id): Path<Uuid>,
    Json(input): Json<UpdateResellerInput>,
) -> AppResult<Json<Reseller>> {
    let service = ResellerService::new(state.store, &state.config);
    let reseller = service.update_reseller(reseller_id, input).await?;
    Ok(Json(reseller))
}

/// Delete a reseller
pub async fn delete_reseller(
    State(state): State<AppState>,
    Path(reseller_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ResellerService::new(state.store, &state.config);
    service.delete_reseller(reseller_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
