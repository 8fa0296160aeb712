//! Post service
//!
//! Post creation plus the viewer-dependent visibility rules: non-admin
//! viewers (including anonymous callers) only ever see posts whose
//! blacklisted flag is clear, and a direct lookup of a concealed post is
//! reported as not-found rather than as a permission error.

use crate::db::repositories::{NewPost, PostRepository};
use crate::models::{NewPostInput, Post, User};
use crate::services::auth::Identity;
use crate::services::ServiceError;
use anyhow::Context;
use std::sync::Arc;

const POST_NOT_FOUND: &str = "Post does not exist or has been removed";

/// Post management service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
}

impl PostService {
    /// Create a new post service
    pub fn new(post_repo: Arc<dyn PostRepository>) -> Self {
        Self { post_repo }
    }

    /// Create a post authored by the given user.
    pub async fn create_post(
        &self,
        author: &User,
        input: NewPostInput,
    ) -> Result<Post, ServiceError> {
        validate_new_post_input(&input)?;

        let post = self
            .post_repo
            .create(&NewPost {
                title: input.title,
                content: input.content,
                author_id: author.id,
            })
            .await
            .context("Failed to create post")?;

        tracing::debug!(post_id = post.id, author_id = author.id, "post created");

        Ok(post)
    }

    /// Fetch a single post as seen by the given viewer.
    pub async fn get_post(&self, viewer: &Identity, id: i64) -> Result<Post, ServiceError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(POST_NOT_FOUND))?;

        // concealment, not permission: a blacklisted post looks absent
        if post.blacklisted && !viewer.is_admin() {
            return Err(ServiceError::not_found(POST_NOT_FOUND));
        }

        Ok(post)
    }

    /// List posts as seen by the given viewer, newest first.
    pub async fn list_posts(&self, viewer: &Identity) -> Result<Vec<Post>, ServiceError> {
        let posts = self
            .post_repo
            .list_newest_first(viewer.is_admin())
            .await
            .context("Failed to list posts")?;

        Ok(posts)
    }

    /// Flip a post's blacklisted flag, returning a confirmation message.
    pub async fn toggle_flag(&self, id: i64) -> Result<String, ServiceError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(POST_NOT_FOUND))?;

        self.post_repo
            .set_blacklisted(post.id, !post.blacklisted)
            .await
            .context("Failed to toggle post flag")?;

        tracing::info!(
            post_id = post.id,
            blacklisted = !post.blacklisted,
            "post moderation flag toggled"
        );

        Ok(if post.blacklisted {
            "Post has been whitelisted".to_string()
        } else {
            "Post has been blacklisted".to_string()
        })
    }
}

fn validate_new_post_input(input: &NewPostInput) -> Result<(), ServiceError> {
    if input.title.trim().is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if input.content.trim().is_empty() {
        return Err(ServiceError::validation("content is required"));
    }
    Ok(())
}
