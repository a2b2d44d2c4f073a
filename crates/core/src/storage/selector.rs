//! Per-request backend selection.

use opendal::Operator;
use std::path::PathBuf;
use std::sync::Arc;
use tidepool_shared::config::StorageSettings;

use super::{BucketStorage, LocalStorage, StorageError, StorageService, bucket_operator};

/// Storage handles available to the process.
///
/// A bucket binding, when present, wins over the local directory.
#[derive(Debug, Clone)]
pub struct StorageBindings {
    bucket: Option<Operator>,
    public_url: Option<String>,
    local_root: PathBuf,
}

impl StorageBindings {
    /// Bindings with only a local directory.
    #[must_use]
    pub fn local(local_root: impl Into<PathBuf>, public_url: Option<String>) -> Self {
        Self {
            bucket: None,
            public_url,
            local_root: local_root.into(),
        }
    }

    /// Attach a bucket operator.
    #[must_use]
    pub fn with_bucket(mut self, operator: Operator) -> Self {
        self.bucket = Some(operator);
        self
    }

    /// Build bindings from configuration, constructing the bucket operator if configured.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the bucket settings are rejected.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let bindings = Self::local(&settings.local_root, settings.public_url.clone());
        match &settings.bucket {
            Some(bucket) => Ok(bindings.with_bucket(bucket_operator(bucket)?)),
            None => Ok(bindings),
        }
    }

    /// Returns true when a bucket is bound.
    #[must_use]
    pub fn has_bucket(&self) -> bool {
        self.bucket.is_some()
    }

    /// Pick the backend: bucket if bound, otherwise the local directory.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the local root cannot be resolved.
    pub fn select(&self) -> Result<Arc<dyn StorageService>, StorageError> {
        match &self.bucket {
            Some(operator) => Ok(Arc::new(BucketStorage::new(
                operator.clone(),
                self.public_url.clone(),
            ))),
            None => Ok(Arc::new(LocalStorage::new(
                &self.local_root,
                self.public_url.clone(),
            )?)),
        }
    }
}
