//! File error types.

use serde_json::json;
use thiserror::Error;
use tidepool_shared::AppError;

use crate::storage::StorageError;

/// File operation errors.
#[derive(Debug, Error)]
pub enum FileError {
    /// No metadata row for the key.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Metadata row exists but the backend has no blob.
    #[error("file {0} not found in storage")]
    BlobMissing(String),

    /// Requester does not own the file.
    #[error("file {0} belongs to another user")]
    Forbidden(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl FileError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(key) => {
                Self::not_found("FILE_NOT_FOUND", format!("File {key} not found"))
                    .with_details(json!({ "reason": "metadata_missing" }))
            }
            FileError::BlobMissing(key) => {
                Self::not_found("FILE_NOT_FOUND", format!("File {key} not found in storage"))
                    .with_details(json!({ "reason": "blob_missing" }))
            }
            FileError::Forbidden(_) => {
                Self::Forbidden("You do not have permission to delete this file".to_string())
            }
            FileError::Storage(e) => e.into(),
            FileError::Repository(msg) => Self::Database(msg),
        }
    }
}
