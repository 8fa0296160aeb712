//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Authoring user
    pub author_id: i64,
    /// Soft-disabled flag; blacklisted posts are concealed from non-admins
    pub blacklisted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct NewPostInput {
    pub title: String,
    pub content: String,
}
