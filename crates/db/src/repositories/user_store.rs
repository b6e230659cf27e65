use async_trait::async_trait;
use userhub_core::types::DbId;

use crate::models::user::{CreateUser, UpdateUser, User};

/// Error type for user store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this email address.
    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// CRUD access to user records.
///
/// Implementations must be safe to share across request handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// List all users, most recently created first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Insert a new user, returning the stored row.
    async fn create(&self, input: &CreateUser) -> Result<User, StoreError>;

    /// Apply the non-`None` fields of `input`. Returns `None` if `id` does
    /// not exist.
    async fn update(&self, id: DbId, input: &UpdateUser) -> Result<Option<User>, StoreError>;

    /// Delete a user. Returns `true` if a row was removed.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
