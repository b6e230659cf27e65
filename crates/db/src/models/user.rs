//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use userhub_core::types::{DbId, Timestamp};
use validator::{Validate, ValidationError};

/// Full user row from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: Timestamp,
}

/// DTO for creating a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
}

/// DTO for updating an existing user. All fields are optional; absent fields
/// keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
