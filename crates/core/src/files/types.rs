//! File domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::{Download, UploadData};

/// Metadata row describing one stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Record ID.
    pub id: Uuid,
    /// Storage key (unique).
    pub key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Uploading user, cleared when the user is deleted.
    pub user_id: Option<Uuid>,
    /// Free-form metadata.
    pub metadata: Option<Value>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether `requester` may delete this file.
    ///
    /// Denied only when both the requester and the owner are known and differ.
    /// Anonymous requests and ownerless files are allowed.
    #[must_use]
    pub fn can_be_deleted_by(&self, requester: Option<Uuid>) -> bool {
        match (requester, self.user_id) {
            (Some(requester), Some(owner)) => requester == owner,
            _ => true,
        }
    }
}

/// Input for inserting a metadata row.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Storage key.
    pub key: String,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Uploading user.
    pub user_id: Option<Uuid>,
    /// Free-form metadata.
    pub metadata: Option<Value>,
}

/// An upload request after the HTTP body has been parsed.
#[derive(Debug)]
pub struct UploadInput {
    /// Client-supplied filename, sanitized into the key.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Payload.
    pub data: UploadData,
    /// Session user, if any.
    pub user_id: Option<Uuid>,
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Inserted metadata row.
    pub record: FileRecord,
    /// URL reported by the backend.
    pub url: String,
}

/// Metadata plus the opened blob.
#[derive(Debug)]
pub struct FileDownload {
    /// Metadata row.
    pub record: FileRecord,
    /// Blob contents.
    pub download: Download,
}
