//! User API endpoints
//!
//! - GET /v1/users            (admin-only listing, unshaped records)
//! - GET /v1/users/{id}       (viewer-shaped record)
//! - PUT /v1/users/{id}/flag  (SUPER-only moderation toggle)

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::Confirmation;
use crate::models::{Role, User};
use crate::services::{Identity, UserView};

/// GET /v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<User>>, ApiError> {
    let user = identity.require_user()?;
    state.auth.authorize(user, None)?;

    let users = state.users.list_users().await?;
    Ok(Json(users))
}

/// GET /v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
    let view = state.users.get_user(&identity, id).await?;
    Ok(Json(view))
}

/// PUT /v1/users/{id}/flag
///
/// Account moderation requires the SUPER role exactly; an ADMIN caller
/// is denied even though ADMIN is an admin role.
pub async fn toggle_user_flag(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<Confirmation>, ApiError> {
    let user = identity.require_user()?;
    state.auth.authorize(user, Some(Role::Super))?;

    let message = state.users.toggle_flag(id).await?;
    Ok(Json(Confirmation::new(message)))
}
