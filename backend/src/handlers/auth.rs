//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::auth::{AuthResponse, AuthService, RegisterInput};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let auth_service = AuthService::new(state.store, &state.config);
    let response = auth_service.login(&body.email, &body.password).await?;
    Ok(Json(response))
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let auth_service = AuthService::new(state.store, &state.config);
    let response = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Profile of the signed-in user
pub async fn get_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.store, &state.config);
    let user = auth_service.profile(current_user.0.user_id).await?;
    Ok(Json(user))
}
