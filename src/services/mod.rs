//! Business logic services
//!
//! Services sit between the HTTP layer and the repositories. They own the
//! session validation, role authorization, and visibility rules, and they
//! return typed errors that the API layer maps to status codes.

pub mod auth;
pub mod password;
pub mod posts;
pub mod users;

pub use auth::{AuthService, AuthSuccess, Identity};
pub use posts::PostService;
pub use users::{UserService, UserView};

/// Error taxonomy shared by all services.
///
/// Every variant maps to exactly one transport status at the API boundary;
/// services never retry internally and every error short-circuits the call.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing, expired, or invalid session; bad credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but insufficient role
    #[error("{0}")]
    Forbidden(String),

    /// Resource absent, or concealed by visibility rules
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// Unexpected store failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Check whether an error chain bottoms out in a unique-constraint
/// violation from the store, so it can be reported as a conflict instead
/// of leaking the engine's native error shape.
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
