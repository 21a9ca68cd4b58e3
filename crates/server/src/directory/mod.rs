//! User directory: the storage contract the authentication core depends on.
//!
//! The directory, not the services, enforces email uniqueness. `create` must
//! be atomic with respect to that constraint and report a violation as
//! [`DirectoryError::EmailExists`]; services never check-then-insert.

mod database;
mod memory;

pub use database::SeaOrmDirectory;
pub use memory::MemoryDirectory;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::user::{Model as User, NewUser};
use crate::error::AuthError;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("a user with this email already exists")]
    EmailExists,
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::EmailExists => AuthError::EmailExists,
            DirectoryError::NotFound => AuthError::UserNotFound,
            DirectoryError::Backend(e) => AuthError::Infrastructure(e),
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    async fn get_by_id(&self, id: i32) -> Result<User, DirectoryError>;

    /// Insert a new user. Fails with `EmailExists` if the email is taken,
    /// including when a concurrent create for the same email won the race.
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError>;

    /// Persist `user` by id (last writer wins), refreshing `updated_at`.
    async fn update(&self, user: User) -> Result<User, DirectoryError>;
}
