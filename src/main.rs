//! Postern - a session-authenticated posting and moderation API

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postern::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository},
    },
    services::{AuthService, PostService, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postern=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Postern API...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    // Initialize services
    let auth = Arc::new(AuthService::new(
        user_repo.clone(),
        session_repo.clone(),
        config.session.expiry_hours,
    ));
    let users = Arc::new(UserService::new(
        user_repo.clone(),
        session_repo,
        post_repo.clone(),
    ));
    let posts = Arc::new(PostService::new(post_repo));

    let state = AppState { auth, users, posts };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Api running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
