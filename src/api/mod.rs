//! API layer - HTTP handlers and routing
//!
//! Routes are grouped by their session requirement:
//! - public: login, account creation, logout (token in body)
//! - session required: account management, post creation, moderation
//! - session optional: reads whose result shape depends on the viewer

pub mod accounts;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod users;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

pub use middleware::{ApiError, AppState, SESSION_TOKEN_HEADER};

/// Build the versioned API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let session_routes = Router::new()
        .route("/update-account", put(accounts::update_account))
        .route("/change-password", put(accounts::change_password))
        .route("/create-post", post(posts::create_post))
        .route("/users", get(users::list_users))
        .route("/users/{id}/flag", put(users::toggle_user_flag))
        .route("/posts/{id}/flag", put(posts::toggle_post_flag))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    let viewer_routes = Router::new()
        .route("/users/{id}", get(users::get_user))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_session,
        ));

    Router::new()
        .route("/login", post(accounts::login))
        .route("/create-account", post(accounts::create_account))
        .route("/logout", put(accounts::logout))
        .merge(session_routes)
        .merge(viewer_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_TOKEN_HEADER),
        ]);

    Router::new()
        .nest("/v1", build_api_router(state.clone()))
        .fallback(unknown_route)
        .layer(cors)
        .with_state(state)
}

/// Fallback for unmatched paths
async fn unknown_route() -> ApiError {
    ApiError::not_found("API link does not exist or is no longer available")
}
