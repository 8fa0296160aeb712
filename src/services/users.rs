//! User service
//!
//! Account self-management (profile update, password change) and the
//! viewer-dependent shaping of user records:
//! - non-admins cannot resolve a blacklisted user at all (reported as
//!   not-found so existence stays concealed)
//! - role, profile, and session list appear only for an admin viewer or
//!   the user looking at themselves
//! - the target's posts are filtered by the viewer's admin status
//!
//! The admin-only user listing intentionally bypasses this shaping and
//! returns the raw records.

use crate::db::repositories::{
    AccountUpdate, PostRepository, ProfileUpdate, SessionRepository, UserRepository,
};
use crate::models::{
    ChangePasswordInput, Gender, Post, Profile, Role, Session, Theme, UpdateAccountInput, User,
};
use crate::services::auth::Identity;
use crate::services::password::{hash_password, verify_password};
use crate::services::{is_unique_violation, ServiceError};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

const USER_NOT_FOUND: &str = "User does not exist or has been removed";

/// A user record shaped for a particular viewer.
///
/// The privileged fields use a double `Option`: the outer layer controls
/// whether the field appears in the serialized shape at all, the inner
/// layer carries the usual nullability (a user may simply have no
/// profile).
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posts: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Option<Profile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
}

/// User management service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        post_repo: Arc<dyn PostRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            post_repo,
        }
    }

    /// Fetch a single user shaped for the given viewer.
    pub async fn get_user(&self, viewer: &Identity, id: i64) -> Result<UserView, ServiceError> {
        let viewer_is_admin = viewer.is_admin();

        let target = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))?;

        // a blacklisted user resolves only for admin viewers
        if target.blacklisted && !viewer_is_admin {
            return Err(ServiceError::not_found(USER_NOT_FOUND));
        }

        // post sub-collection follows the viewer's admin status, not the
        // target's
        let posts = self
            .post_repo
            .list_by_author(target.id, viewer_is_admin)
            .await
            .context("Failed to list user's posts")?;

        let is_self = viewer.user().map(|u| u.id) == Some(target.id);
        let privileged = viewer_is_admin || is_self;

        let (role, profile, sessions) = if privileged {
            let profile = self
                .user_repo
                .get_profile(target.id)
                .await
                .context("Failed to get profile")?;
            let sessions = self
                .session_repo
                .list_by_user(target.id)
                .await
                .context("Failed to list sessions")?;
            (Some(target.role), Some(profile), Some(sessions))
        } else {
            (None, None, None)
        };

        Ok(UserView {
            id: target.id,
            first_name: target.first_name,
            last_name: target.last_name,
            email: target.email,
            blacklisted: target.blacklisted,
            created_at: target.created_at,
            updated_at: target.updated_at,
            posts,
            role,
            profile,
            sessions,
        })
    }

    /// List every user, newest first.
    ///
    /// Admin-only; the caller is expected to have passed authorization.
    /// Records are returned unshaped (password hash excluded by serde).
    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let users = self
            .user_repo
            .list_newest_first()
            .await
            .context("Failed to list users")?;

        Ok(users)
    }

    /// Update the caller's account fields and upsert their profile.
    pub async fn update_account(
        &self,
        user: &User,
        input: UpdateAccountInput,
    ) -> Result<(), ServiceError> {
        validate_update_account_input(&input)?;

        let gender = Gender::from_str(&input.gender)
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        let theme = input
            .theme
            .as_deref()
            .map(Theme::from_str)
            .transpose()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        // the new email must not belong to someone else
        if let Some(existing) = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
        {
            if existing.id != user.id {
                return Err(ServiceError::conflict("email already exists"));
            }
        }

        let account = AccountUpdate {
            email: input.email,
            first_name: input.first_name,
            last_name: input.last_name,
        };
        match self.user_repo.update_account(user.id, &account).await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::conflict("email already exists"));
            }
            Err(e) => return Err(e.into()),
        }

        self.user_repo
            .upsert_profile(
                user.id,
                &ProfileUpdate {
                    phone: input.phone,
                    address: input.address,
                    gender,
                    theme,
                },
            )
            .await
            .context("Failed to upsert profile")?;

        Ok(())
    }

    /// Change the caller's password after re-verifying the current one.
    pub async fn change_password(
        &self,
        user: &User,
        input: ChangePasswordInput,
    ) -> Result<(), ServiceError> {
        validate_change_password_input(&input)?;

        let current_ok = verify_password(&input.current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !current_ok {
            return Err(ServiceError::unauthenticated("Incorrect password"));
        }

        if input.new_password != input.repeat_password {
            return Err(ServiceError::validation(
                "repeat_password must match new_password",
            ));
        }

        if input.new_password == input.current_password {
            return Err(ServiceError::validation(
                "new_password is same as current_password",
            ));
        }

        let new_hash = hash_password(&input.new_password).context("Failed to hash password")?;

        self.user_repo
            .update_password(user.id, &new_hash)
            .await
            .context("Failed to update password")?;

        Ok(())
    }

    /// Flip a user's blacklisted flag, returning a confirmation message.
    pub async fn toggle_flag(&self, id: i64) -> Result<String, ServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))?;

        self.user_repo
            .set_blacklisted(user.id, !user.blacklisted)
            .await
            .context("Failed to toggle user flag")?;

        tracing::info!(
            user_id = user.id,
            blacklisted = !user.blacklisted,
            "user moderation flag toggled"
        );

        Ok(if user.blacklisted {
            "User has been whitelisted".to_string()
        } else {
            "User has been blacklisted".to_string()
        })
    }
}

fn validate_update_account_input(input: &UpdateAccountInput) -> Result<(), ServiceError> {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(ServiceError::validation("email must be a valid email"));
    }
    for (name, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
        ("phone", &input.phone),
        ("address", &input.address),
        ("gender", &input.gender),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::validation(format!("{name} is required")));
        }
    }
    Ok(())
}

fn validate_change_password_input(input: &ChangePasswordInput) -> Result<(), ServiceError> {
    for (name, value) in [
        ("current_password", &input.current_password),
        ("new_password", &input.new_password),
        ("repeat_password", &input.repeat_password),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::validation(format!("{name} is required")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        NewPost, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::NewUser;
    use crate::services::auth::AuthService;

    struct Fixture {
        pool: DynDatabasePool,
        users: UserService,
        auth: AuthService,
        posts: Arc<dyn PostRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());

        Fixture {
            pool: pool.clone(),
            users: UserService::new(user_repo.clone(), session_repo.clone(), post_repo.clone()),
            auth: AuthService::new(user_repo, session_repo, 24),
            posts: post_repo,
        }
    }

    async fn create_user(fx: &Fixture, email: &str, role: Role) -> User {
        SqlxUserRepository::new(fx.pool.clone())
            .create(&NewUser {
                email: email.to_string(),
                password_hash: crate::services::password::hash_password("password123")
                    .expect("Failed to hash"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
            })
            .await
            .expect("Failed to create user")
    }

    async fn identity_for(fx: &Fixture, email: &str) -> Identity {
        let auth = fx
            .auth
            .login(crate::models::LoginInput {
                email: email.to_string(),
                password: "password123".to_string(),
            })
            .await
            .expect("Login failed");
        fx.auth
            .validate(Some(&auth.session.token), true)
            .await
            .expect("Validation failed")
    }

    fn update_input(email: &str) -> UpdateAccountInput {
        UpdateAccountInput {
            email: email.to_string(),
            first_name: "New".to_string(),
            last_name: "Name".to_string(),
            phone: "0123456789".to_string(),
            address: "1 Main St".to_string(),
            gender: "female".to_string(),
            theme: Some("dark".to_string()),
        }
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    #[tokio::test]
    async fn test_get_user_anonymous_base_fields_only() {
        let fx = setup().await;
        let target = create_user(&fx, "target@x.com", Role::User).await;

        let view = fx
            .users
            .get_user(&Identity::Anonymous, target.id)
            .await
            .expect("Failed to get user");

        assert_eq!(view.email, "target@x.com");
        assert!(view.role.is_none());
        assert!(view.profile.is_none());
        assert!(view.sessions.is_none());

        let json = serde_json::to_value(&view).expect("Failed to serialize");
        assert!(json.get("role").is_none());
        assert!(json.get("profile").is_none());
        assert!(json.get("sessions").is_none());
        assert_eq!(json["blacklisted"], false);
    }

    #[tokio::test]
    async fn test_get_user_self_sees_privileged_fields() {
        let fx = setup().await;
        let target = create_user(&fx, "self@x.com", Role::User).await;
        let viewer = identity_for(&fx, "self@x.com").await;

        let view = fx
            .users
            .get_user(&viewer, target.id)
            .await
            .expect("Failed to get user");

        assert_eq!(view.role, Some(Role::User));
        // no profile row yet: field present, value null
        assert!(matches!(view.profile, Some(None)));
        let sessions = view.sessions.as_ref().expect("Sessions should be listed");
        assert_eq!(sessions.len(), 1);

        let json = serde_json::to_value(&view).expect("Failed to serialize");
        assert!(json["profile"].is_null());
        assert_eq!(json["role"], "USER");
    }

    #[tokio::test]
    async fn test_get_user_unrelated_viewer_not_privileged() {
        let fx = setup().await;
        let target = create_user(&fx, "target@x.com", Role::User).await;
        create_user(&fx, "other@x.com", Role::User).await;
        let viewer = identity_for(&fx, "other@x.com").await;

        let view = fx
            .users
            .get_user(&viewer, target.id)
            .await
            .expect("Failed to get user");

        assert!(view.role.is_none());
        assert!(view.sessions.is_none());
    }

    #[tokio::test]
    async fn test_get_user_admin_sees_privileged_fields() {
        let fx = setup().await;
        let target = create_user(&fx, "target@x.com", Role::User).await;
        create_user(&fx, "admin@x.com", Role::Admin).await;
        let viewer = identity_for(&fx, "admin@x.com").await;

        let view = fx
            .users
            .get_user(&viewer, target.id)
            .await
            .expect("Failed to get user");

        assert_eq!(view.role, Some(Role::User));
        assert!(view.sessions.is_some());
    }

    #[tokio::test]
    async fn test_get_blacklisted_user_concealed_from_non_admins() {
        let fx = setup().await;
        let target = create_user(&fx, "flagged@x.com", Role::User).await;
        SqlxUserRepository::new(fx.pool.clone())
            .set_blacklisted(target.id, true)
            .await
            .expect("Failed to blacklist");

        // anonymous and unrelated viewers get not-found
        let result = fx.users.get_user(&Identity::Anonymous, target.id).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        create_user(&fx, "other@x.com", Role::User).await;
        let viewer = identity_for(&fx, "other@x.com").await;
        let result = fx.users.get_user(&viewer, target.id).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        // an admin still resolves the record
        create_user(&fx, "admin@x.com", Role::Admin).await;
        let admin = identity_for(&fx, "admin@x.com").await;
        let view = fx
            .users
            .get_user(&admin, target.id)
            .await
            .expect("Admin should resolve blacklisted user");
        assert!(view.blacklisted);
    }

    #[tokio::test]
    async fn test_get_user_posts_follow_viewer_admin_status() {
        let fx = setup().await;
        let target = create_user(&fx, "author@x.com", Role::User).await;

        let visible = fx
            .posts
            .create(&NewPost {
                title: "Visible".to_string(),
                content: "ok".to_string(),
                author_id: target.id,
            })
            .await
            .expect("Failed to create post");
        let hidden = fx
            .posts
            .create(&NewPost {
                title: "Hidden".to_string(),
                content: "flagged".to_string(),
                author_id: target.id,
            })
            .await
            .expect("Failed to create post");
        fx.posts
            .set_blacklisted(hidden.id, true)
            .await
            .expect("Failed to blacklist post");

        let view = fx
            .users
            .get_user(&Identity::Anonymous, target.id)
            .await
            .expect("Failed to get user");
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].id, visible.id);

        create_user(&fx, "admin@x.com", Role::Admin).await;
        let admin = identity_for(&fx, "admin@x.com").await;
        let view = fx
            .users
            .get_user(&admin, target.id)
            .await
            .expect("Failed to get user");
        assert_eq!(view.posts.len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let fx = setup().await;
        let result = fx.users.get_user(&Identity::Anonymous, 999).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_users_newest_first_unfiltered() {
        let fx = setup().await;
        let first = create_user(&fx, "first@x.com", Role::User).await;
        let second = create_user(&fx, "second@x.com", Role::User).await;
        SqlxUserRepository::new(fx.pool.clone())
            .set_blacklisted(first.id, true)
            .await
            .expect("Failed to blacklist");

        let users = fx.users.list_users().await.expect("Failed to list");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, second.id);
        // listing is not filtered by the blacklisted flag
        assert!(users.iter().any(|u| u.blacklisted));
    }

    // ========================================================================
    // Account management
    // ========================================================================

    #[tokio::test]
    async fn test_update_account_upserts_profile() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        fx.users
            .update_account(&user, update_input("me@x.com"))
            .await
            .expect("Failed to update account");

        let repo = SqlxUserRepository::new(fx.pool.clone());
        let updated = repo
            .get_by_id(user.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(updated.first_name, "New");

        let profile = repo
            .get_profile(user.id)
            .await
            .expect("Failed to get profile")
            .expect("Profile should exist");
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.theme, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn test_update_account_email_conflict() {
        let fx = setup().await;
        create_user(&fx, "taken@x.com", Role::User).await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        let result = fx.users.update_account(&user, update_input("taken@x.com")).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_account_keeping_own_email() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        // re-submitting your own email is not a conflict
        fx.users
            .update_account(&user, update_input("me@x.com"))
            .await
            .expect("Should not conflict with self");
    }

    #[tokio::test]
    async fn test_update_account_invalid_gender() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        let mut input = update_input("me@x.com");
        input.gender = "robot".to_string();
        let result = fx.users.update_account(&user, input).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_change_password_flow() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        fx.users
            .change_password(
                &user,
                ChangePasswordInput {
                    current_password: "password123".to_string(),
                    new_password: "fresh-password".to_string(),
                    repeat_password: "fresh-password".to_string(),
                },
            )
            .await
            .expect("Failed to change password");

        // old password no longer logs in, new one does
        let old = fx
            .auth
            .login(crate::models::LoginInput {
                email: "me@x.com".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(old, Err(ServiceError::Unauthenticated(_))));

        fx.auth
            .login(crate::models::LoginInput {
                email: "me@x.com".to_string(),
                password: "fresh-password".to_string(),
            })
            .await
            .expect("New password should log in");
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        let result = fx
            .users
            .change_password(
                &user,
                ChangePasswordInput {
                    current_password: "wrong".to_string(),
                    new_password: "fresh-password".to_string(),
                    repeat_password: "fresh-password".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_change_password_repeat_mismatch() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        let result = fx
            .users
            .change_password(
                &user,
                ChangePasswordInput {
                    current_password: "password123".to_string(),
                    new_password: "fresh-password".to_string(),
                    repeat_password: "different".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_change_password_same_as_current() {
        let fx = setup().await;
        let user = create_user(&fx, "me@x.com", Role::User).await;

        let result = fx
            .users
            .change_password(
                &user,
                ChangePasswordInput {
                    current_password: "password123".to_string(),
                    new_password: "password123".to_string(),
                    repeat_password: "password123".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    // ========================================================================
    // Moderation
    // ========================================================================

    #[tokio::test]
    async fn test_toggle_flag_round_trip() {
        let fx = setup().await;
        let user = create_user(&fx, "flagme@x.com", Role::User).await;

        let msg = fx.users.toggle_flag(user.id).await.expect("Failed to toggle");
        assert_eq!(msg, "User has been blacklisted");

        let msg = fx.users.toggle_flag(user.id).await.expect("Failed to toggle");
        assert_eq!(msg, "User has been whitelisted");

        let repo = SqlxUserRepository::new(fx.pool.clone());
        let restored = repo
            .get_by_id(user.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert!(!restored.blacklisted);
    }

    #[tokio::test]
    async fn test_toggle_flag_unknown_user() {
        let fx = setup().await;
        let result = fx.users.toggle_flag(999).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
