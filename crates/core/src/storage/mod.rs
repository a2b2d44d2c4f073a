//! Key-addressed blob storage.
//!
//! One [`StorageService`] contract, two backends:
//! - [`LocalStorage`]: a directory tree with `<key>.meta.json` sidecars (development)
//! - [`BucketStorage`]: an Apache OpenDAL operator (S3-compatible, Azure Blob, memory)
//!
//! [`StorageBindings::select`] picks the backend for a request.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       StorageService                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ upload(key, data, type)     │ download(key) -> Option<Download> │
//! │ delete(key) -> bool         │ list(prefix, limit)               │
//! │ signed_url(key, ttl)        │ backend_name()                    │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                                     │
//!   LocalStorage (tokio::fs)            BucketStorage (opendal)
//! ```

mod bucket;
mod config;
mod error;
mod local;
mod selector;

pub use bucket::BucketStorage;
pub use config::{bucket_operator, provider_name};
pub use error::StorageError;
pub use local::LocalStorage;
pub use selector::StorageBindings;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::time::Duration;

/// Content type used when the caller supplies none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maximum keys returned by `list` when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Signed URL lifetime when no expiry is given: 1 hour.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Suffix of the local backend's metadata sidecars; blob keys may not end with it.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Byte stream of a stored object.
pub type BlobStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Blob payload accepted by [`StorageService::upload`].
pub enum UploadData {
    /// Raw bytes.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// Chunked byte stream, drained before writing.
    Stream(BlobStream),
}

impl UploadData {
    /// Wrap a chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// Normalize the payload into one contiguous buffer.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by a stream payload.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(Bytes::from(text)),
            Self::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.try_next().await? {
                    buffer.extend_from_slice(&chunk);
                }
                Ok(buffer.freeze())
            }
        }
    }
}

impl fmt::Debug for UploadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for UploadData {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for UploadData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for UploadData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Key the blob was stored under.
    pub key: String,
    /// Bytes written.
    pub size: u64,
    /// Backend entity tag, empty when the backend reports none.
    pub etag: String,
    /// Direct or public URL of the blob.
    pub url: String,
}

/// A stored blob opened for reading.
pub struct Download {
    /// MIME type recorded at upload.
    pub content_type: String,
    /// Blob size in bytes, when known.
    pub size: Option<u64>,
    /// Blob contents.
    pub body: BlobStream,
}

impl Download {
    /// Collect the body into one buffer.
    ///
    /// # Errors
    ///
    /// Returns the first read error from the body stream.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        UploadData::Stream(self.body).into_bytes().await
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Key-addressed blob store.
///
/// Keys are `/`-separated relative paths such as `uploads/1700000000000-a.txt`.
/// Uploading to an existing key overwrites it.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Short backend identifier for logs (`local`, `bucket`).
    fn backend_name(&self) -> &'static str;

    /// Store `data` under `key`.
    ///
    /// A missing `content_type` is stored as [`DEFAULT_CONTENT_TYPE`].
    async fn upload(
        &self,
        key: &str,
        data: UploadData,
        content_type: Option<&str>,
    ) -> Result<UploadResult, StorageError>;

    /// Open the blob under `key`; `None` when it does not exist.
    async fn download(&self, key: &str) -> Result<Option<Download>, StorageError>;

    /// Remove the blob under `key`, returning whether a blob was removed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Keys starting with `prefix` in ascending order, at most `limit`
    /// (default [`DEFAULT_LIST_LIMIT`]).
    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError>;

    /// Time-limited read URL, or the direct URL when the backend cannot sign.
    async fn signed_url(
        &self,
        key: &str,
        expires_in: Option<Duration>,
    ) -> Result<String, StorageError>;
}

/// Reject keys that could escape the blob space.
///
/// # Errors
///
/// Returns `InvalidKey` for empty or absolute keys, and for keys with empty,
/// `.` or `..` segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::invalid_key(key));
    }
    let bad_segment = key
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment || key.contains('\0') {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

/// Join a public URL prefix and a key.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{key}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("uploads/1-a.txt")]
    #[case("a")]
    #[case("deep/nested/path/file.bin")]
    #[case("uploads/..hidden")]
    fn test_valid_keys(#[case] key: &str) {
        assert!(validate_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("/etc/passwd")]
    #[case("\\windows")]
    #[case("../escape")]
    #[case("uploads/../../escape")]
    #[case("uploads/./a")]
    #[case("uploads//a")]
    #[case("uploads/")]
    fn test_invalid_keys(#[case] key: &str) {
        assert!(matches!(
            validate_key(key),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_join_url_trims_trailing_slash() {
        assert_eq!(
            join_url("https://cdn.example.com/", "uploads/a.txt"),
            "https://cdn.example.com/uploads/a.txt"
        );
        assert_eq!(join_url("/api/files", "k"), "/api/files/k");
    }

    #[tokio::test]
    async fn test_upload_data_normalization() {
        let text = UploadData::from("hello").into_bytes().await.unwrap();
        assert_eq!(&text[..], b"hello");

        let chunks = vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ];
        let streamed = UploadData::from_stream(futures::stream::iter(chunks))
            .into_bytes()
            .await
            .unwrap();
        assert_eq!(&streamed[..], b"hello");
    }

    #[tokio::test]
    async fn test_upload_data_stream_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"ok")),
            Err(std::io::Error::other("connection reset")),
        ];
        let result = UploadData::from_stream(futures::stream::iter(chunks))
            .into_bytes()
            .await;
        assert!(result.is_err());
    }

    // Property: keys containing a parent segment never validate
    proptest! {
        #[test]
        fn prop_parent_segment_rejected(
            head in "[a-z0-9]{1,8}",
            tail in "[a-z0-9]{1,8}",
        ) {
            let key = format!("{head}/../{tail}");
            prop_assert!(validate_key(&key).is_err());
        }
    }
}
