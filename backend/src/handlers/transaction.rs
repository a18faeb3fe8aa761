//! HTTP handlers for the cash ledger

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::models::Transaction;
use crate::services::ledger::{CashInInput, CashOutInput, LedgerEntry, LedgerService};
use crate::AppState;

/// List all transactions, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Transaction>>> {
    let service = LedgerService::new(state.store, &state.config);
    let transactions = service.list_transactions().await?;
    Ok(Json(transactions))
}

/// Record incoming cash
pub async fn record_cash_in(
    State(state): State<AppState>,
    Json(input): Json<CashInInput>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let service = LedgerService::new(state.store, &state.config);
    let entry = service.record_cash_in(input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Record outgoing cash
pub async fn record_cash_out(
    State(state): State<AppState>,
    Json(input): Json<CashOutInput>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    let service = LedgerService::new(state.store, &state.config);
    let entry = service.record_cash_out(input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Download the ledger as CSV
pub async fn export_transactions(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = LedgerService::new(state.store, &state.config);
    let csv = service.export_transactions().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    ))
}
