//! Dashboard handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::DashboardData;
use crate::services::DashboardService;
use crate::AppState;

pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardData>> {
    let service = DashboardService::new(state.store, &state.config);
    let dashboard = service.get_dashboard().await?;
    Ok(Json(dashboard))
}
