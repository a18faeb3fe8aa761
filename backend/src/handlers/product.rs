//! HTTP handlers for product endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Product;
use crate::services::product::{
    CreateProductInput, ProductService, RestockInput, UpdateProductInput,
};
use crate::AppState;

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.store, &state.config);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.store, &state.config);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Products at or below their stock alert
pub async fn list_low_stock_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.store, &state.config);
    let products = service.list_low_stock().await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store, &state.config);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store, &state.config);
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Add stock to a product
pub async fn restock_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<RestockInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store, &state.config);
    let product = service.restock(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product no order refers to
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ProductService::new(state.store, &state.config);
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
