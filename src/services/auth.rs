//! Authentication service
//!
//! Owns the session lifecycle and the two authorization checks:
//! - `validate` resolves a presented token into an [`Identity`]
//! - `authorize` gates admin-only operations on the resolved user
//!
//! Session issuance happens on login and on account creation
//! (auto-login). Sessions are invalidated, never deleted: on logout, on
//! expiry detection during a required validation, or implicitly when the
//! owning user is blacklisted.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateAccountInput, LoginInput, NewUser, Role, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::{is_unique_violation, ServiceError};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// The resolved caller of a request.
#[derive(Debug, Clone)]
pub enum Identity {
    /// No valid session presented
    Anonymous,
    /// A valid session and its owning user
    Authenticated { user: User, session: Session },
}

impl Identity {
    /// The authenticated user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated { user, .. } => Some(user),
            Identity::Anonymous => None,
        }
    }

    /// Whether the caller is an authenticated admin (ADMIN or SUPER)
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }

    /// The authenticated user, or an unauthenticated error.
    ///
    /// Handlers behind the required-session middleware use this to unwrap
    /// the precondition; hitting the error path means the middleware was
    /// not applied.
    pub fn require_user(&self) -> Result<&User, ServiceError> {
        self.user()
            .ok_or_else(|| ServiceError::unauthenticated("Session expired"))
    }
}

/// Issued session data returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response to a successful login or account creation.
///
/// The user's password hash is excluded by its serde attributes.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSuccess {
    pub session: IssuedSession,
    pub user: User,
}

/// Authentication and authorization service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    expiry_hours: i64,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        expiry_hours: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            expiry_hours,
        }
    }

    /// Resolve a presented token into an identity.
    ///
    /// With `required == true` a missing or invalid session fails with
    /// `Unauthenticated`; an invalid-but-found session is additionally
    /// invalidated best-effort before the rejection. With
    /// `required == false` anything short of a fully valid session
    /// resolves to `Anonymous`.
    pub async fn validate(
        &self,
        token: Option<&str>,
        required: bool,
    ) -> Result<Identity, ServiceError> {
        let token = match token {
            Some(t) => t,
            None => {
                if required {
                    return Err(ServiceError::unauthenticated("Session expired"));
                }
                return Ok(Identity::Anonymous);
            }
        };

        let found = self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to look up session")?;

        let found = match found {
            Some(f) => f,
            None => {
                if required {
                    return Err(ServiceError::unauthenticated("Session expired"));
                }
                return Ok(Identity::Anonymous);
            }
        };

        let now = Utc::now();
        let invalid = !found.session.is_valid_at(now) || found.user.blacklisted;

        if invalid {
            if required {
                // fire-and-forget: the rejection does not wait for the
                // write, and a failed write must not surface to the caller
                let repo = Arc::clone(&self.session_repo);
                let stale = token.to_string();
                tokio::spawn(async move {
                    if let Err(e) = repo.invalidate(&stale).await {
                        tracing::warn!("Failed to invalidate stale session: {e:#}");
                    }
                });
                return Err(ServiceError::unauthenticated("Session expired"));
            }
            // a found-but-invalid session is coerced to Anonymous rather
            // than leaking the stale records to the caller
            return Ok(Identity::Anonymous);
        }

        Ok(Identity::Authenticated {
            user: found.user,
            session: found.session,
        })
    }

    /// Gate an admin-only operation.
    ///
    /// Two independent checks: when `required` is given the user's role
    /// must equal it exactly (requiring SUPER denies ADMIN), and in every
    /// case the role must be one of the admin roles.
    pub fn authorize(&self, user: &User, required: Option<Role>) -> Result<(), ServiceError> {
        if let Some(required) = required {
            if user.role != required {
                return Err(ServiceError::forbidden("Access denied"));
            }
        }

        if !user.role.is_admin() {
            return Err(ServiceError::forbidden("Access denied"));
        }

        Ok(())
    }

    /// Authenticate with email and password, issuing a new session.
    pub async fn login(&self, input: LoginInput) -> Result<AuthSuccess, ServiceError> {
        validate_login_input(&input)?;

        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| ServiceError::unauthenticated("Invalid user"))?;

        if user.blacklisted {
            return Err(ServiceError::unauthenticated(
                "This account has been suspended",
            ));
        }

        let password_ok = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_ok {
            return Err(ServiceError::unauthenticated("Incorrect password"));
        }

        let session = self.issue_session(user.id).await?;
        tracing::debug!(user_id = user.id, "login succeeded");

        Ok(AuthSuccess {
            session: IssuedSession {
                token: session.token,
                expires_at: session.expires_at,
            },
            user,
        })
    }

    /// Create a new account and log it in.
    ///
    /// Email uniqueness is checked up front and enforced by the store's
    /// unique constraint; either path reports `Conflict`.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<AuthSuccess, ServiceError> {
        validate_create_account_input(&input)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(ServiceError::conflict("email already exists"));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let new_user = NewUser {
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            role: Role::User,
        };

        let user = match self.user_repo.create(&new_user).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(ServiceError::conflict("email already exists"));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = user.id, "account created");

        let session = self.issue_session(user.id).await?;

        Ok(AuthSuccess {
            session: IssuedSession {
                token: session.token,
                expires_at: session.expires_at,
            },
            user,
        })
    }

    /// Invalidate the session identified by `token`.
    ///
    /// An unknown token is `Unauthenticated`; a known token that is
    /// already invalidated is accepted, so logging out twice is not an
    /// error.
    pub async fn logout(&self, token: &str) -> Result<(), ServiceError> {
        let found = self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to look up session")?
            .ok_or_else(|| ServiceError::unauthenticated("Token does not match any session"))?;

        if !found.session.blacklisted {
            self.session_repo
                .invalidate(token)
                .await
                .context("Failed to invalidate session")?;
        }

        Ok(())
    }

    /// Generate and persist a fresh session for a user
    async fn issue_session(&self, user_id: i64) -> Result<Session, ServiceError> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::hours(self.expiry_hours),
            blacklisted: false,
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

fn validate_login_input(input: &LoginInput) -> Result<(), ServiceError> {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(ServiceError::validation("email must be a valid email"));
    }
    if input.password.is_empty() {
        return Err(ServiceError::validation("password is required"));
    }
    Ok(())
}

fn validate_create_account_input(input: &CreateAccountInput) -> Result<(), ServiceError> {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(ServiceError::validation("email must be a valid email"));
    }
    if input.password.trim().is_empty() {
        return Err(ServiceError::validation("password is required"));
    }
    if input.first_name.trim().is_empty() {
        return Err(ServiceError::validation("first_name is required"));
    }
    if input.last_name.trim().is_empty() {
        return Err(ServiceError::validation("last_name is required"));
    }
    Ok(())
}
