//! Local filesystem backend.
//!
//! Blobs live at `<root>/<key>`; each blob has a `<key>.meta.json` sidecar
//! holding `{"contentType": ..., "size": ...}`.

use async_trait::async_trait;
use chrono::Utc;
use futures::{FutureExt, StreamExt};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::{
    DEFAULT_CONTENT_TYPE, DEFAULT_LIST_LIMIT, Download, SIDECAR_SUFFIX, StorageError, StorageService,
    UploadData, UploadResult, join_url, validate_key,
};

/// URL prefix served by the files API when no public URL is configured.
const FILES_ROUTE: &str = "/api/files";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Storage backend rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_url: Option<String>,
}

impl LocalStorage {
    /// Create a backend rooted at `root`, resolved to an absolute path.
    ///
    /// The directory is created lazily on first upload.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the path cannot be made absolute.
    pub fn new(root: impl AsRef<Path>, public_url: Option<String>) -> Result<Self, StorageError> {
        let root = std::path::absolute(root.as_ref()).map_err(|e| {
            StorageError::configuration(format!(
                "cannot resolve storage root {}: {e}",
                root.as_ref().display()
            ))
        })?;
        Ok(Self { root, public_url })
    }

    /// Absolute root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn url_for(&self, key: &str) -> String {
        join_url(self.public_url.as_deref().unwrap_or(FILES_ROUTE), key)
    }

    async fn read_content_type(path: &Path) -> String {
        let sidecar = match fs::read(sidecar_path(path)).await {
            Ok(raw) => serde_json::from_slice::<Sidecar>(&raw).ok(),
            Err(_) => None,
        };
        sidecar
            .and_then(|s| s.content_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Depth-first walk in name order, collecting blob keys that start with `prefix`.
    fn walk<'a>(
        &'a self,
        dir: PathBuf,
        prefix: &'a str,
        limit: usize,
        keys: &'a mut Vec<String>,
    ) -> BoxFuture<'a, ()> {
        async move {
            if keys.len() >= limit {
                return;
            }
            let Ok(mut reader) = fs::read_dir(&dir).await else {
                return;
            };
            let mut entries = Vec::new();
            while let Ok(Some(entry)) = reader.next_entry().await {
                entries.push(entry);
            }
            entries.sort_by_key(fs::DirEntry::file_name);

            for entry in entries {
                if keys.len() >= limit {
                    break;
                }
                let path = entry.path();
                match entry.file_type().await {
                    Ok(kind) if kind.is_dir() => self.walk(path, prefix, limit, keys).await,
                    Ok(_) if !is_sidecar(&path) => {
                        if let Some(key) = self.relative_key(&path)
                            && key.starts_with(prefix)
                        {
                            keys.push(key);
                        }
                    }
                    _ => {}
                }
            }
        }
        .boxed()
    }
}

fn sidecar_path(blob: &Path) -> PathBuf {
    let mut path = blob.as_os_str().to_owned();
    path.push(SIDECAR_SUFFIX);
    PathBuf::from(path)
}

fn is_sidecar(path: &Path) -> bool {
    path.to_string_lossy().ends_with(SIDECAR_SUFFIX)
}

#[async_trait]
impl StorageService for LocalStorage {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn upload(
        &self,
        key: &str,
        data: UploadData,
        content_type: Option<&str>,
    ) -> Result<UploadResult, StorageError> {
        validate_key(key)?;
        if key.ends_with(SIDECAR_SUFFIX) {
            return Err(StorageError::invalid_key(key));
        }

        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let buffer = data.into_bytes().await?;
        let size = buffer.len() as u64;
        fs::write(&path, &buffer).await?;

        let sidecar = Sidecar {
            content_type: Some(content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string()),
            size: Some(size),
        };
        let sidecar = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::operation(format!("sidecar encoding failed: {e}")))?;
        fs::write(sidecar_path(&path), sidecar).await?;

        debug!(key = %key, size, "stored blob on local disk");

        Ok(UploadResult {
            key: key.to_string(),
            size,
            etag: format!("\"{}\"", Utc::now().timestamp_millis()),
            url: self.url_for(key),
        })
    }

    async fn download(&self, key: &str) -> Result<Option<Download>, StorageError> {
        validate_key(key)?;
        let path = self.blob_path(key);

        let metadata = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            _ => return Ok(None),
        };
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(Download {
            content_type: Self::read_content_type(&path).await,
            size: Some(metadata.len()),
            body: ReaderStream::new(file).boxed(),
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let path = self.blob_path(key);

        if let Err(e) = fs::remove_file(&path).await {
            debug!(key = %key, error = %e, "local blob not removed");
            return Ok(false);
        }
        if let Err(e) = fs::remove_file(sidecar_path(&path)).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(key = %key, error = %e, "failed to remove sidecar");
        }
        Ok(true)
    }

    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let prefix = prefix.unwrap_or_default();
        // start from the deepest directory the prefix names
        let start = match prefix.rfind('/') {
            Some(end) if end > 0 => {
                let dir = &prefix[..end];
                validate_key(dir)?;
                self.root.join(dir)
            }
            _ => self.root.clone(),
        };

        let mut keys = Vec::new();
        self.walk(start, prefix, limit, &mut keys).await;
        Ok(keys)
    }

    async fn signed_url(
        &self,
        key: &str,
        _expires_in: Option<Duration>,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(self.url_for(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), None).unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_preserves_bytes_and_type() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);

        let result = store
            .upload("uploads/1-a.txt", "hello".into(), Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(result.size, 5);
        assert_eq!(result.url, "/api/files/uploads/1-a.txt");
        assert!(result.etag.starts_with('"') && result.etag.ends_with('"'));

        let download = store.download("uploads/1-a.txt").await.unwrap().unwrap();
        assert_eq!(download.content_type, "text/plain");
        assert_eq!(download.size, Some(5));
        assert_eq!(&download.into_bytes().await.unwrap()[..], b"hello");

        let sidecar = std::fs::read_to_string(dir.path().join("uploads/1-a.txt.meta.json")).unwrap();
        let sidecar: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(sidecar["contentType"], "text/plain");
        assert_eq!(sidecar["size"], 5);
    }

    #[tokio::test]
    async fn test_missing_sidecar_defaults_content_type() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        store.upload("a.bin", vec![1u8, 2, 3].into(), None).await.unwrap();
        std::fs::remove_file(dir.path().join("a.bin.meta.json")).unwrap();

        let download = store.download("a.bin").await.unwrap().unwrap();
        assert_eq!(download.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_defaults_content_type() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        store.upload("a.txt", "x".into(), Some("text/plain")).await.unwrap();
        std::fs::write(dir.path().join("a.txt.meta.json"), b"{not json").unwrap();

        let download = store.download("a.txt").await.unwrap().unwrap();
        assert_eq!(download.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_download_missing_and_directory() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        assert!(store.download("nope.txt").await.unwrap().is_none());

        store.upload("uploads/x", "x".into(), None).await.unwrap();
        assert!(store.download("uploads").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        store.upload("k.txt", "data".into(), None).await.unwrap();

        assert!(store.delete("k.txt").await.unwrap());
        assert!(!dir.path().join("k.txt.meta.json").exists());
        assert!(!store.delete("k.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_blob() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        store.upload("k", "first".into(), Some("text/plain")).await.unwrap();
        store.upload("k", "second!".into(), Some("text/csv")).await.unwrap();

        let download = store.download("k").await.unwrap().unwrap();
        assert_eq!(download.content_type, "text/csv");
        assert_eq!(&download.into_bytes().await.unwrap()[..], b"second!");
    }

    #[tokio::test]
    async fn test_list_sorted_skips_sidecars() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        for key in ["uploads/b.txt", "uploads/a.txt", "other/c.txt", "uploads/nested/d.txt"] {
            store.upload(key, "x".into(), None).await.unwrap();
        }

        let all = store.list(None, None).await.unwrap();
        assert_eq!(
            all,
            vec![
                "other/c.txt",
                "uploads/a.txt",
                "uploads/b.txt",
                "uploads/nested/d.txt",
            ]
        );

        let uploads = store.list(Some("uploads/"), None).await.unwrap();
        assert_eq!(uploads.len(), 3);
        assert!(uploads.iter().all(|k| k.starts_with("uploads/")));

        let partial = store.list(Some("uploads/a"), None).await.unwrap();
        assert_eq!(partial, vec!["uploads/a.txt"]);

        let capped = store.list(None, Some(2)).await.unwrap();
        assert_eq!(capped, vec!["other/c.txt", "uploads/a.txt"]);
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        assert!(store.list(Some("missing"), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        assert!(matches!(
            store.upload("../escape.txt", "x".into(), None).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(store.download("/etc/passwd").await.is_err());
        assert!(store.upload("a.txt.meta.json", "x".into(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_signed_url_uses_public_url() {
        let dir = TempDir::new().unwrap();
        let store =
            LocalStorage::new(dir.path(), Some("https://cdn.example.com/".to_string())).unwrap();
        let url = store
            .signed_url("uploads/a.txt", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/uploads/a.txt");
        assert_eq!(store.backend_name(), "local");
    }

    #[test]
    fn test_root_is_absolute() {
        let store = LocalStorage::new("./storage", None).unwrap();
        assert!(store.root().is_absolute());
    }
}
