//! User model
//!
//! Defines the User entity, the role enumeration used for authorization,
//! and the optional per-user Profile sub-record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// The password hash is never serialized into any response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// User role
    pub role: Role,
    /// Soft-disabled flag; blacklisted users cannot authenticate
    pub blacklisted: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if the user may perform moderation actions
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// User role for authorization.
///
/// Roles form a fixed three-level enumeration. ADMIN and SUPER are the
/// admin roles permitted to moderate content; SUPER alone may moderate
/// user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular account
    #[default]
    User,
    /// Content moderator
    Admin,
    /// Full moderator, including account moderation
    Super,
}

impl Role {
    /// Whether this role belongs to the admin subset {ADMIN, SUPER}
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Super)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Super => write!(f, "SUPER"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "SUPER" => Ok(Role::Super),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

/// Optional profile attached to a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user
    pub user_id: i64,
    /// Phone number
    pub phone: String,
    /// Postal address
    pub address: String,
    /// Gender
    pub gender: Gender,
    /// Preferred UI theme
    pub theme: Option<Theme>,
}

/// Gender recorded on a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "MALE"),
            Gender::Female => write!(f, "FEMALE"),
            Gender::Other => write!(f, "OTHER"),
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "OTHER" => Ok(Gender::Other),
            _ => Err(anyhow::anyhow!(
                "gender can either be male or female or other"
            )),
        }
    }
}

/// UI theme preference recorded on a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Theme {
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "LIGHT"),
            Theme::Dark => write!(f, "DARK"),
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LIGHT" => Ok(Theme::Light),
            "DARK" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("theme can either be light or dark")),
        }
    }
}

/// Columns written when inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Input for account creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Input for login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for self-service account update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAccountInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub gender: String,
    pub theme: Option<String>,
}

/// Input for a password change
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
    pub repeat_password: String,
}
