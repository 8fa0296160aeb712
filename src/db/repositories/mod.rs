//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod post;
pub mod session;
pub mod user;

pub use post::{NewPost, PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{AccountUpdate, ProfileUpdate, SqlxUserRepository, UserRepository};
