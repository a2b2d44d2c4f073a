//! File service implementation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::FileError;
use super::key::upload_key;
use super::types::{FileDownload, FileRecord, NewFileRecord, UploadInput, UploadedFile};
use crate::storage::StorageService;

/// Repository trait for file metadata persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a metadata row.
    async fn create(&self, input: NewFileRecord) -> Result<FileRecord, FileError>;

    /// Find the row for a storage key.
    async fn find_by_key(&self, key: &str) -> Result<Option<FileRecord>, FileError>;

    /// Rows owned by `owner`, or all rows when `None`, oldest first.
    async fn list(&self, owner: Option<Uuid>) -> Result<Vec<FileRecord>, FileError>;

    /// Delete the row for a storage key.
    async fn delete_by_key(&self, key: &str) -> Result<bool, FileError>;
}

/// Coordinates a storage backend with the metadata repository.
pub struct FileService {
    storage: Arc<dyn StorageService>,
    repo: Arc<dyn FileRepository>,
}

impl FileService {
    /// Create a new file service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageService>, repo: Arc<dyn FileRepository>) -> Self {
        Self { storage, repo }
    }

    /// Store a blob and record its metadata.
    ///
    /// If the metadata insert fails the blob is removed again before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write or the metadata insert fails.
    pub async fn upload(&self, input: UploadInput) -> Result<UploadedFile, FileError> {
        let key = upload_key(&input.filename);
        let stored = self
            .storage
            .upload(&key, input.data, Some(&input.content_type))
            .await?;

        let new_record = NewFileRecord {
            key: key.clone(),
            filename: input.filename,
            mime_type: input.content_type,
            size: i64::try_from(stored.size).unwrap_or(i64::MAX),
            user_id: input.user_id,
            metadata: None,
        };

        match self.repo.create(new_record).await {
            Ok(record) => {
                info!(
                    key = %key,
                    size = record.size,
                    backend = self.storage.backend_name(),
                    "file uploaded"
                );
                Ok(UploadedFile {
                    record,
                    url: stored.url,
                })
            }
            Err(e) => {
                match self.storage.delete(&key).await {
                    Ok(_) => warn!(key = %key, error = %e, "metadata insert failed; blob removed"),
                    Err(cleanup) => error!(
                        key = %key,
                        error = %e,
                        cleanup_error = %cleanup,
                        "metadata insert failed; orphaned blob left behind"
                    ),
                }
                Err(e)
            }
        }
    }

    /// List metadata rows, filtered to `owner` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(&self, owner: Option<Uuid>) -> Result<Vec<FileRecord>, FileError> {
        self.repo.list(owner).await
    }

    /// Open a file for download.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` without a metadata row and `BlobMissing` when the
    /// row exists but the backend has no blob.
    pub async fn download(&self, key: &str) -> Result<FileDownload, FileError> {
        let record = self
            .repo
            .find_by_key(key)
            .await?
            .ok_or_else(|| FileError::NotFound(key.to_string()))?;

        let download = self
            .storage
            .download(key)
            .await?
            .ok_or_else(|| FileError::BlobMissing(key.to_string()))?;

        Ok(FileDownload { record, download })
    }

    /// Delete a file's blob and metadata row.
    ///
    /// The blob goes first; the row is kept if the backend call errors so the
    /// delete can be retried.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` without a metadata row, `Forbidden` when the
    /// requester does not own the file, or a storage/repository error.
    pub async fn delete(&self, key: &str, requester: Option<Uuid>) -> Result<FileRecord, FileError> {
        let record = self
            .repo
            .find_by_key(key)
            .await?
            .ok_or_else(|| FileError::NotFound(key.to_string()))?;

        if !record.can_be_deleted_by(requester) {
            return Err(FileError::Forbidden(key.to_string()));
        }

        if !self.storage.delete(key).await? {
            warn!(key = %key, "blob already absent; removing metadata");
        }
        self.repo.delete_by_key(key).await?;

        info!(key = %key, "file deleted");
        Ok(record)
    }
}
