//! Post repository
//!
//! Database operations for posts. Listing takes an `include_blacklisted`
//! switch so the visibility filter can widen the result set for admin
//! viewers without a second query shape.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Post;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Columns written when inserting a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: i64,
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &NewPost) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// List all posts, newest first
    async fn list_newest_first(&self, include_blacklisted: bool) -> Result<Vec<Post>>;

    /// List a user's posts, newest first
    async fn list_by_author(&self, author_id: i64, include_blacklisted: bool) -> Result<Vec<Post>>;

    /// Set the blacklisted flag
    async fn set_blacklisted(&self, id: i64, blacklisted: bool) -> Result<()>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_newest_first(&self, include_blacklisted: bool) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), include_blacklisted).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), include_blacklisted).await
            }
        }
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        include_blacklisted: bool,
    ) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_by_author_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    author_id,
                    include_blacklisted,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                list_posts_by_author_mysql(
                    self.pool.as_mysql().unwrap(),
                    author_id,
                    include_blacklisted,
                )
                .await
            }
        }
    }

    async fn set_blacklisted(&self, id: i64, blacklisted: bool) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_post_blacklisted_sqlite(self.pool.as_sqlite().unwrap(), id, blacklisted).await
            }
            DatabaseDriver::Mysql => {
                set_post_blacklisted_mysql(self.pool.as_mysql().unwrap(), id, blacklisted).await
            }
        }
    }
}

const POST_COLUMNS: &str = "id, title, content, author_id, blacklisted, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, author_id, blacklisted, created_at, updated_at)
        VALUES (?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: post.title.clone(),
        content: post.content.clone(),
        author_id: post.author_id,
        blacklisted: false,
        created_at: now,
        updated_at: now,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(pool: &SqlitePool, include_blacklisted: bool) -> Result<Vec<Post>> {
    let sql = if include_blacklisted {
        format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC")
    } else {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE blacklisted = FALSE ORDER BY created_at DESC, id DESC"
        )
    };

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_sqlite).collect())
}

async fn list_posts_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    include_blacklisted: bool,
) -> Result<Vec<Post>> {
    let sql = if include_blacklisted {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? ORDER BY created_at DESC, id DESC"
        )
    } else {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? AND blacklisted = FALSE ORDER BY created_at DESC, id DESC"
        )
    };

    let rows = sqlx::query(&sql)
        .bind(author_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    Ok(rows.iter().map(row_to_post_sqlite).collect())
}

async fn set_post_blacklisted_sqlite(pool: &SqlitePool, id: i64, blacklisted: bool) -> Result<()> {
    sqlx::query("UPDATE posts SET blacklisted = ?, updated_at = ? WHERE id = ?")
        .bind(blacklisted)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set post blacklisted flag")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        blacklisted: row.get("blacklisted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewPost) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, author_id, blacklisted, created_at, updated_at)
        VALUES (?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        title: post.title.clone(),
        content: post.content.clone(),
        author_id: post.author_id,
        blacklisted: false,
        created_at: now,
        updated_at: now,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_posts_mysql(pool: &MySqlPool, include_blacklisted: bool) -> Result<Vec<Post>> {
    let sql = if include_blacklisted {
        format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC")
    } else {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE blacklisted = FALSE ORDER BY created_at DESC, id DESC"
        )
    };

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    Ok(rows.iter().map(row_to_post_mysql).collect())
}

async fn list_posts_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    include_blacklisted: bool,
) -> Result<Vec<Post>> {
    let sql = if include_blacklisted {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? ORDER BY created_at DESC, id DESC"
        )
    } else {
        format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE author_id = ? AND blacklisted = FALSE ORDER BY created_at DESC, id DESC"
        )
    };

    let rows = sqlx::query(&sql)
        .bind(author_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by author")?;

    Ok(rows.iter().map(row_to_post_mysql).collect())
}

async fn set_post_blacklisted_mysql(pool: &MySqlPool, id: i64, blacklisted: bool) -> Result<()> {
    sqlx::query("UPDATE posts SET blacklisted = ?, updated_at = ? WHERE id = ?")
        .bind(blacklisted)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to set post blacklisted flag")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        blacklisted: row.get("blacklisted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
