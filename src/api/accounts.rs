//! Account API endpoints
//!
//! Handles authentication and self-service account management:
//! - POST /v1/login
//! - POST /v1/create-account (auto-login)
//! - PUT  /v1/logout (token in body)
//! - PUT  /v1/update-account
//! - PUT  /v1/change-password

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::Confirmation;
use crate::models::{ChangePasswordInput, CreateAccountInput, LoginInput, UpdateAccountInput};
use crate::services::{AuthSuccess, Identity};

/// Request body for logout
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// POST /v1/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthSuccess>, ApiError> {
    let auth = state.auth.login(body).await?;
    Ok(Json(auth))
}

/// POST /v1/create-account
pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountInput>,
) -> Result<Json<AuthSuccess>, ApiError> {
    let auth = state.auth.create_account(body).await?;
    Ok(Json(auth))
}

/// PUT /v1/logout
///
/// The token to invalidate is carried in the body, so no session
/// middleware is involved.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> Result<Json<Confirmation>, ApiError> {
    if body.token.trim().is_empty() {
        return Err(ApiError::validation_error("token is required"));
    }

    state.auth.logout(&body.token).await?;
    Ok(Json(Confirmation::new("Logout was successful")))
}

/// PUT /v1/update-account
pub async fn update_account(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpdateAccountInput>,
) -> Result<Json<Confirmation>, ApiError> {
    let user = identity.require_user()?;
    state.users.update_account(user, body).await?;
    Ok(Json(Confirmation::new("Update was successful")))
}

/// PUT /v1/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<ChangePasswordInput>,
) -> Result<Json<Confirmation>, ApiError> {
    let user = identity.require_user()?;
    state.users.change_password(user, body).await?;
    Ok(Json(Confirmation::new("Password change was successful")))
}
