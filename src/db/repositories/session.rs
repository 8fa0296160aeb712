//! Session repository
//!
//! Database operations for auth sessions. Sessions are never deleted:
//! invalidation sets the blacklisted flag, and token lookup joins the
//! owning user so the validator can check both records in one round trip.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Role, Session, SessionWithUser, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get a session by token, joined with its owning user
    async fn get_by_token(&self, token: &str) -> Result<Option<SessionWithUser>>;

    /// Mark a session invalid. Idempotent; invalidating an
    /// already-invalid session is a no-op.
    async fn invalidate(&self, token: &str) -> Result<()>;

    /// List all sessions belonging to a user, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_session_sqlite(self.pool.as_sqlite().unwrap(), session).await
            }
            DatabaseDriver::Mysql => {
                create_session_mysql(self.pool.as_mysql().unwrap(), session).await
            }
        }
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<SessionWithUser>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_session_by_token_sqlite(self.pool.as_sqlite().unwrap(), token).await
            }
            DatabaseDriver::Mysql => {
                get_session_by_token_mysql(self.pool.as_mysql().unwrap(), token).await
            }
        }
    }

    async fn invalidate(&self, token: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                invalidate_session_sqlite(self.pool.as_sqlite().unwrap(), token).await
            }
            DatabaseDriver::Mysql => {
                invalidate_session_mysql(self.pool.as_mysql().unwrap(), token).await
            }
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sessions_by_user_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                list_sessions_by_user_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }
}

const JOINED_COLUMNS: &str = "s.token, s.user_id, s.expires_at, s.blacklisted AS session_blacklisted, s.created_at AS session_created_at, \
     u.id, u.email, u.password_hash, u.first_name, u.last_name, u.role, u.blacklisted, u.created_at, u.updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, expires_at, blacklisted, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.token)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.blacklisted)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_token_sqlite(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<SessionWithUser>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {JOINED_COLUMNS}
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by token")?;

    match row {
        Some(row) => Ok(Some(row_to_session_with_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn invalidate_session_sqlite(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET blacklisted = TRUE WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to invalidate session")?;

    Ok(())
}

async fn list_sessions_by_user_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Session>> {
    let rows = sqlx::query(
        r#"
        SELECT token, user_id, expires_at, blacklisted, created_at
        FROM sessions
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sessions by user")?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(Session {
            token: row.get("token"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            blacklisted: row.get("blacklisted"),
            created_at: row.get("created_at"),
        });
    }

    Ok(sessions)
}

fn row_to_session_with_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<SessionWithUser> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(SessionWithUser {
        session: Session {
            token: row.get("token"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            blacklisted: row.get("session_blacklisted"),
            created_at: row.get("session_created_at"),
        },
        user: User {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            role,
            blacklisted: row.get("blacklisted"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, expires_at, blacklisted, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.token)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.blacklisted)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_token_mysql(
    pool: &MySqlPool,
    token: &str,
) -> Result<Option<SessionWithUser>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {JOINED_COLUMNS}
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by token")?;

    match row {
        Some(row) => Ok(Some(row_to_session_with_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn invalidate_session_mysql(pool: &MySqlPool, token: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET blacklisted = TRUE WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to invalidate session")?;

    Ok(())
}

async fn list_sessions_by_user_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Session>> {
    let rows = sqlx::query(
        r#"
        SELECT token, user_id, expires_at, blacklisted, created_at
        FROM sessions
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sessions by user")?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(Session {
            token: row.get("token"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            blacklisted: row.get("blacklisted"),
            created_at: row.get("created_at"),
        });
    }

    Ok(sessions)
}

fn row_to_session_with_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<SessionWithUser> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(SessionWithUser {
        session: Session {
            token: row.get("token"),
            user_id: row.get("user_id"),
            expires_at: row.get("expires_at"),
            blacklisted: row.get("session_blacklisted"),
            created_at: row.get("session_created_at"),
        },
        user: User {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            role,
            blacklisted: row.get("blacklisted"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
    })
}
