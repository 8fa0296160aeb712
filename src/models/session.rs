//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Session entity: server-issued proof of prior authentication.
///
/// A session is never deleted; it is invalidated by setting `blacklisted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token (primary lookup key)
    pub token: String,
    /// Owning user
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Invalidation flag
    pub blacklisted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session has expired at `now`.
    ///
    /// Comparison is at hour granularity: the session counts as expired
    /// only once `now` is past `expires_at` by at least one whole hour.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.expires_at).num_hours() >= 1
    }

    /// A session is valid iff it is not blacklisted and not expired.
    /// The owner's blacklisted flag is checked separately by the validator.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.blacklisted && !self.is_expired_at(now)
    }
}

/// Session joined with its owning user, as returned by token lookup
#[derive(Debug, Clone)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: User,
}
