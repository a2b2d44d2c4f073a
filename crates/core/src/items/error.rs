//! Item error types.

use thiserror::Error;
use tidepool_shared::AppError;
use uuid::Uuid;

/// Item operation errors.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Item not found.
    #[error("item not found: {0}")]
    NotFound(Uuid),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ItemError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<ItemError> for AppError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::NotFound(id) => {
                Self::not_found("ITEM_NOT_FOUND", format!("Item with id {id} not found"))
            }
            ItemError::Repository(msg) => Self::Database(msg),
        }
    }
}
