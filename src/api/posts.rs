//! Post API endpoints
//!
//! - POST /v1/create-post
//! - GET  /v1/posts
//! - GET  /v1/posts/{id}
//! - PUT  /v1/posts/{id}/flag (any-admin moderation toggle)

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::Confirmation;
use crate::models::{NewPostInput, Post};
use crate::services::Identity;

/// POST /v1/create-post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<NewPostInput>,
) -> Result<Json<Post>, ApiError> {
    let user = identity.require_user()?;
    let post = state.posts.create_post(user, body).await?;
    Ok(Json(post))
}

/// GET /v1/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.posts.list_posts(&identity).await?;
    Ok(Json(posts))
}

/// GET /v1/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    let post = state.posts.get_post(&identity, id).await?;
    Ok(Json(post))
}

/// PUT /v1/posts/{id}/flag
pub async fn toggle_post_flag(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<Confirmation>, ApiError> {
    let user = identity.require_user()?;
    state.auth.authorize(user, None)?;

    let message = state.posts.toggle_flag(id).await?;
    Ok(Json(Confirmation::new(message)))
}
