//! Seed binary
//!
//! Creates the initial SUPER account so a fresh deployment has a
//! moderator to log in with. Credentials come from SEED_EMAIL and
//! SEED_PASSWORD, with development defaults.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postern::{
    config::Config,
    db::{
        self,
        repositories::{SqlxUserRepository, UserRepository},
    },
    models::{NewUser, Role},
    services::password::hash_password,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postern=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let email = std::env::var("SEED_EMAIL").unwrap_or_else(|_| "janedoe@email.com".to_string());
    let password = std::env::var("SEED_PASSWORD").unwrap_or_else(|_| "123456".to_string());

    let config = Config::load(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let users = SqlxUserRepository::new(pool.clone());

    if users.get_by_email(&email).await?.is_some() {
        tracing::info!("Seed user {} already exists, nothing to do", email);
        return Ok(());
    }

    let user = users
        .create(&NewUser {
            email: email.clone(),
            password_hash: hash_password(&password)?,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: Role::Super,
        })
        .await?;

    tracing::info!(
        user_id = user.id,
        "Seeded SUPER account; login with email {} and the configured password",
        email
    );

    Ok(())
}
