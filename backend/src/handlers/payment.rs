//! HTTP handlers for payment endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Payment;
use crate::services::ledger::{LedgerService, PaymentReceipt, RecordPaymentInput};
use crate::AppState;

/// List payments
pub async fn list_payments(State(state): State<AppState>) -> AppResult<Json<Vec<Payment>>> {
    let service = LedgerService::new(state.store, &state.config);
    let payments = service.list_payments().await?;
    Ok(Json(payments))
}

/// Get the payment of an order
pub async fn get_payment_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Payment>> {
    let service = LedgerService::new(state.store, &state.config);
    let payment = service.get_payment_by_order(order_id).await?;
    Ok(Json(payment))
}

/// Record a payment against an order
pub async fn record_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<Json<PaymentReceipt>> {
    let service = LedgerService::new(state.store, &state.config);
    let receipt = service.record_payment(order_id, input).await?;
    Ok(Json(receipt))
}
