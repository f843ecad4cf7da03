//! Login, registration and the caller's own profile

use axum::{extract::State, Json};

use crate::extract::ValidatedJson;
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    dto::{AuthResponse, LoginRequest, RegisterRequest, UserProfile},
    errors::{AppError, Result},
};

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.accounts().login(&request).await?;
    Ok(Json(response))
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.accounts().register(request).await?;
    Ok(Json(response))
}

/// Profile of the bearer
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserProfile>> {
    state
        .accounts()
        .profile(&auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("user", &auth.user_id))
}
