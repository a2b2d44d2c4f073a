//! Object bucket backend over an OpenDAL operator.

use async_trait::async_trait;
use futures::StreamExt;
use opendal::{ErrorKind, Operator};
use std::time::Duration;
use tracing::debug;

use super::{
    DEFAULT_CONTENT_TYPE, DEFAULT_LIST_LIMIT, DEFAULT_SIGNED_URL_TTL, Download, StorageError,
    StorageService, UploadData, UploadResult, join_url, validate_key,
};

/// Storage backend backed by an object bucket.
#[derive(Debug, Clone)]
pub struct BucketStorage {
    operator: Operator,
    public_url: Option<String>,
}

impl BucketStorage {
    /// Wrap an operator; `public_url` prefixes object URLs.
    #[must_use]
    pub fn new(operator: Operator, public_url: Option<String>) -> Self {
        Self {
            operator,
            public_url,
        }
    }

    fn url_for(&self, key: &str) -> String {
        match &self.public_url {
            Some(base) => join_url(base, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for BucketStorage {
    fn backend_name(&self) -> &'static str {
        "bucket"
    }

    async fn upload(
        &self,
        key: &str,
        data: UploadData,
        content_type: Option<&str>,
    ) -> Result<UploadResult, StorageError> {
        validate_key(key)?;
        let buffer = data.into_bytes().await?;
        let size = buffer.len() as u64;
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);

        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(key, buffer)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(key, buffer).await?;
        }

        let etag = self
            .operator
            .stat(key)
            .await
            .ok()
            .and_then(|meta| meta.etag().map(String::from))
            .unwrap_or_default();

        debug!(key = %key, size, "stored blob in bucket");

        Ok(UploadResult {
            key: key.to_string(),
            size,
            etag,
            url: self.url_for(key),
        })
    }

    async fn download(&self, key: &str) -> Result<Option<Download>, StorageError> {
        validate_key(key)?;
        let meta = match self.operator.stat(key).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_type = meta
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let buffer = match self.operator.read(key).await {
            Ok(buffer) => buffer,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let bytes = buffer.to_bytes();

        Ok(Some(Download {
            content_type,
            size: Some(bytes.len() as u64),
            body: futures::stream::once(async move { Ok(bytes) }).boxed(),
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let existed = self.operator.exists(key).await?;
        if existed {
            self.operator.delete(key).await?;
        }
        Ok(existed)
    }

    async fn list(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let prefix = prefix.unwrap_or("");
        let dir = match prefix.rfind('/') {
            Some(idx) => &prefix[..=idx],
            None => "/",
        };

        let entries = match self.operator.list_with(dir).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .map(|entry| entry.path().trim_start_matches('/').to_string())
            .filter(|path| path.starts_with(prefix))
            .collect();
        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }

    async fn signed_url(
        &self,
        key: &str,
        expires_in: Option<Duration>,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        if self.operator.info().full_capability().presign_read {
            let ttl = expires_in.unwrap_or(DEFAULT_SIGNED_URL_TTL);
            let presigned = self.operator.presign_read(key, ttl).await?;
            return Ok(presigned.uri().to_string());
        }
        Ok(self.url_for(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::services;

    fn memory() -> BucketStorage {
        let operator = Operator::new(services::Memory::default())
            .unwrap()
            .finish();
        BucketStorage::new(operator, Some("https://files.example.com".to_string()))
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = memory();
        let result = store
            .upload("uploads/1-a.txt", "0123456789".into(), Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(result.size, 10);
        assert_eq!(result.url, "https://files.example.com/uploads/1-a.txt");

        let download = store.download("uploads/1-a.txt").await.unwrap().unwrap();
        assert_eq!(download.size, Some(10));
        assert_eq!(&download.into_bytes().await.unwrap()[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_download_missing() {
        assert!(memory().download("absent.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_prior_existence() {
        let store = memory();
        store.upload("k.bin", vec![0u8; 4].into(), None).await.unwrap();

        assert!(store.delete("k.bin").await.unwrap());
        assert!(!store.delete("k.bin").await.unwrap());
        assert!(store.download("k.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_caps() {
        let store = memory();
        for key in ["uploads/2-b.txt", "uploads/1-a.txt", "avatars/x.png", "uploads/3-c.txt"] {
            store.upload(key, "x".into(), None).await.unwrap();
        }

        let uploads = store.list(Some("uploads/"), None).await.unwrap();
        assert_eq!(
            uploads,
            vec!["uploads/1-a.txt", "uploads/2-b.txt", "uploads/3-c.txt"]
        );

        let partial = store.list(Some("uploads/2"), None).await.unwrap();
        assert_eq!(partial, vec!["uploads/2-b.txt"]);

        let capped = store.list(None, Some(2)).await.unwrap();
        assert_eq!(capped, vec!["avatars/x.png", "uploads/1-a.txt"]);
    }

    #[tokio::test]
    async fn test_signed_url_falls_back_to_public_url() {
        let store = memory();
        store.upload("a.txt", "x".into(), None).await.unwrap();
        let url = store.signed_url("a.txt", None).await.unwrap();
        assert_eq!(url, "https://files.example.com/a.txt");
    }

    #[tokio::test]
    async fn test_url_without_public_prefix_is_key() {
        let operator = Operator::new(services::Memory::default())
            .unwrap()
            .finish();
        let store = BucketStorage::new(operator, None);
        let result = store.upload("a/b.txt", "x".into(), None).await.unwrap();
        assert_eq!(result.url, "a/b.txt");
        assert_eq!(store.backend_name(), "bucket");
    }
}
