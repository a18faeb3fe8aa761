//! HTTP handlers for the balance

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::{Balance, ReconciliationReport};
use crate::services::balance::{BalanceService, UpdateBalanceInput};
use crate::AppState;

/// Get the current balance
pub async fn get_balance(State(state): State<AppState>) -> AppResult<Json<Balance>> {
    let service = BalanceService::new(state.store, &state.config);
    let balance = service.get_balance().await?;
    Ok(Json(balance))
}

/// Set the opening balance
pub async fn update_balance(
    State(state): State<AppState>,
    Json(input): Json<UpdateBalanceInput>,
) -> AppResult<Json<Balance>> {
    let service = BalanceService::new(state.store, &state.config);
    let balance = service.update_initial_balance(input).await?;
    Ok(Json(balance))
}

/// Audit the balance against the ledger and repair drift
pub async fn reconcile_balance(
    State(state): State<AppState>,
) -> AppResult<Json<ReconciliationReport>> {
    let service = BalanceService::new(state.store, &state.config);
    let report = service.reconcile().await?;
    Ok(Json(report))
}
