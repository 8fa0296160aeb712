//! User repository
//!
//! Database operations for user accounts and their optional profiles.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Gender, NewUser, Profile, Role, Theme, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Columns written when updating the account row
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Columns written when upserting a profile row
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub phone: String,
    pub address: String,
    pub gender: Gender,
    pub theme: Option<Theme>,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &NewUser) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update the account fields (email, names) of a user
    async fn update_account(&self, id: i64, update: &AccountUpdate) -> Result<()>;

    /// Replace the stored password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Set the blacklisted flag
    async fn set_blacklisted(&self, id: i64, blacklisted: bool) -> Result<()>;

    /// List all users, newest first
    async fn list_newest_first(&self) -> Result<Vec<User>>;

    /// Insert or update a user's profile
    async fn upsert_profile(&self, user_id: i64, profile: &ProfileUpdate) -> Result<()>;

    /// Get a user's profile, if any
    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update_account(&self, id: i64, update: &AccountUpdate) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_account_sqlite(self.pool.as_sqlite().unwrap(), id, update).await
            }
            DatabaseDriver::Mysql => {
                update_account_mysql(self.pool.as_mysql().unwrap(), id, update).await
            }
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_password_sqlite(self.pool.as_sqlite().unwrap(), id, password_hash).await
            }
            DatabaseDriver::Mysql => {
                update_password_mysql(self.pool.as_mysql().unwrap(), id, password_hash).await
            }
        }
    }

    async fn set_blacklisted(&self, id: i64, blacklisted: bool) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_user_blacklisted_sqlite(self.pool.as_sqlite().unwrap(), id, blacklisted).await
            }
            DatabaseDriver::Mysql => {
                set_user_blacklisted_mysql(self.pool.as_mysql().unwrap(), id, blacklisted).await
            }
        }
    }

    async fn list_newest_first(&self) -> Result<Vec<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn upsert_profile(&self, user_id: i64, profile: &ProfileUpdate) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_profile_sqlite(self.pool.as_sqlite().unwrap(), user_id, profile).await
            }
            DatabaseDriver::Mysql => {
                upsert_profile_mysql(self.pool.as_mysql().unwrap(), user_id, profile).await
            }
        }
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_profile_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => get_profile_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, blacklisted, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    // no context wrapper here: the service inspects the sqlx error to
    // translate unique-constraint violations into a conflict
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role, blacklisted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.role,
        blacklisted: false,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn update_account_sqlite(pool: &SqlitePool, id: i64, update: &AccountUpdate) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, first_name = ?, last_name = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.email)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

async fn update_password_sqlite(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;

    Ok(())
}

async fn set_user_blacklisted_sqlite(
    pool: &SqlitePool,
    id: i64,
    blacklisted: bool,
) -> Result<()> {
    sqlx::query("UPDATE users SET blacklisted = ?, updated_at = ? WHERE id = ?")
        .bind(blacklisted)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set user blacklisted flag")?;

    Ok(())
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_sqlite(&row)?);
    }

    Ok(users)
}

async fn upsert_profile_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    profile: &ProfileUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, phone, address, gender, theme)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            phone = excluded.phone,
            address = excluded.address,
            gender = excluded.gender,
            theme = excluded.theme
        "#,
    )
    .bind(user_id)
    .bind(&profile.phone)
    .bind(&profile.address)
    .bind(profile.gender.to_string())
    .bind(profile.theme.map(|t| t.to_string()))
    .execute(pool)
    .await
    .context("Failed to upsert profile")?;

    Ok(())
}

async fn get_profile_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT user_id, phone, address, gender, theme FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_sqlite(&row)?)),
        None => Ok(None),
    }
}

fn row_to_profile_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Profile> {
    let gender_str: String = row.get("gender");
    let gender = Gender::from_str(&gender_str)
        .with_context(|| format!("Invalid gender in database: {}", gender_str))?;

    let theme_str: Option<String> = row.get("theme");
    let theme = theme_str
        .map(|s| Theme::from_str(&s).with_context(|| format!("Invalid theme in database: {}", s)))
        .transpose()?;

    Ok(Profile {
        user_id: row.get("user_id"),
        phone: row.get("phone"),
        address: row.get("address"),
        gender,
        theme,
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role,
        blacklisted: row.get("blacklisted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &NewUser) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, role, blacklisted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        role: user.role,
        blacklisted: false,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn update_account_mysql(pool: &MySqlPool, id: i64, update: &AccountUpdate) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, first_name = ?, last_name = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&update.email)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

async fn update_password_mysql(pool: &MySqlPool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;

    Ok(())
}

async fn set_user_blacklisted_mysql(pool: &MySqlPool, id: i64, blacklisted: bool) -> Result<()> {
    sqlx::query("UPDATE users SET blacklisted = ?, updated_at = ? WHERE id = ?")
        .bind(blacklisted)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set user blacklisted flag")?;

    Ok(())
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_mysql(&row)?);
    }

    Ok(users)
}

async fn upsert_profile_mysql(
    pool: &MySqlPool,
    user_id: i64,
    profile: &ProfileUpdate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, phone, address, gender, theme)
        VALUES (?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            phone = VALUES(phone),
            address = VALUES(address),
            gender = VALUES(gender),
            theme = VALUES(theme)
        "#,
    )
    .bind(user_id)
    .bind(&profile.phone)
    .bind(&profile.address)
    .bind(profile.gender.to_string())
    .bind(profile.theme.map(|t| t.to_string()))
    .execute(pool)
    .await
    .context("Failed to upsert profile")?;

    Ok(())
}

async fn get_profile_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT user_id, phone, address, gender, theme FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get profile")?;

    match row {
        Some(row) => Ok(Some(row_to_profile_mysql(&row)?)),
        None => Ok(None),
    }
}

fn row_to_profile_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Profile> {
    let gender_str: String = row.get("gender");
    let gender = Gender::from_str(&gender_str)
        .with_context(|| format!("Invalid gender in database: {}", gender_str))?;

    let theme_str: Option<String> = row.get("theme");
    let theme = theme_str
        .map(|s| Theme::from_str(&s).with_context(|| format!("Invalid theme in database: {}", s)))
        .transpose()?;

    Ok(Profile {
        user_id: row.get("user_id"),
        phone: row.get("phone"),
        address: row.get("address"),
        gender,
        theme,
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role,
        blacklisted: row.get("blacklisted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
