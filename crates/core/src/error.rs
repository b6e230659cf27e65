use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// An operation reached a component that has no action for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported operation: {0}")]
pub struct UnsupportedOperation(pub String);
