//! Data models
//!
//! Entities persisted in the relational store (User, Profile, Session,
//! Post) plus the input types accepted by the services.

mod post;
mod session;
mod user;

pub use post::{NewPostInput, Post};
pub use session::{Session, SessionWithUser};
pub use user::{
    ChangePasswordInput, CreateAccountInput, Gender, LoginInput, NewUser, Profile, Role, Theme,
    UpdateAccountInput, User,
};
