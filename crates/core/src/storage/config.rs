//! Object bucket operator construction.

use opendal::{Operator, services};
use tidepool_shared::config::BucketSettings;

use super::StorageError;

/// Build an OpenDAL operator for the configured bucket.
///
/// # Errors
///
/// Returns `Configuration` if the provider rejects the settings.
pub fn bucket_operator(settings: &BucketSettings) -> Result<Operator, StorageError> {
    let operator = match settings {
        BucketSettings::S3 {
            endpoint,
            bucket,
            access_key_id,
            secret_access_key,
            region,
        } => {
            let builder = services::S3::default()
                .endpoint(endpoint)
                .bucket(bucket)
                .access_key_id(access_key_id)
                .secret_access_key(secret_access_key)
                .region(region);

            Operator::new(builder)
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish()
        }
        BucketSettings::AzureBlob {
            account,
            access_key,
            container,
        } => {
            let builder = services::Azblob::default()
                .account_name(account)
                .account_key(access_key)
                .container(container);

            Operator::new(builder)
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish()
        }
    };
    Ok(operator)
}

/// Provider name and bucket/container of the settings, for startup logs.
#[must_use]
pub fn provider_name(settings: &BucketSettings) -> (&'static str, &str) {
    match settings {
        BucketSettings::S3 { bucket, .. } => ("s3", bucket),
        BucketSettings::AzureBlob { container, .. } => ("azure_blob", container),
    }
}
