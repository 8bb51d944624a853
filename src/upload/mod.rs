//! Object store upload with bounded retry
//!
//! Parses a destination bucket URL into an `object_store` backend and
//! pushes encoded artifacts under deterministic keys. Keys are a pure
//! function of (prefix, object type, part index), so a re-run or a
//! retried upload overwrites rather than duplicates.

use crate::encode::EncodedArtifact;
use crate::error::{is_retryable_store, Error, Result};
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Build the storage key for one part
///
/// Layout: `{prefix}/{objectType}/part-{index:05}.parquet`
pub fn part_key(prefix: &str, object_type: &str, part_index: u32) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{object_type}/part-{part_index:05}.parquet")
    } else {
        format!("{prefix}/{object_type}/part-{part_index:05}.parquet")
    }
}

// ============================================================================
// Destination
// ============================================================================

/// A parsed upload destination
#[derive(Debug, Clone)]
pub struct Destination {
    /// The object store backend
    store: Arc<dyn ObjectStore>,
    /// Display base for returned locations (e.g. `s3://bucket`)
    base: String,
}

impl Destination {
    /// Parse a bucket URL into an object store
    ///
    /// Supported forms:
    /// - `s3://bucket` - AWS S3 (credentials from environment)
    /// - `gs://bucket` - Google Cloud Storage
    /// - `az://container` - Azure Blob Storage
    /// - any other value - local filesystem directory
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(bucket) = url.strip_prefix("s3://") {
            let bucket = bucket.trim_end_matches('/');
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                base: format!("s3://{bucket}"),
            })
        } else if let Some(bucket) = url.strip_prefix("gs://") {
            let bucket = bucket.trim_end_matches('/');
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                base: format!("gs://{bucket}"),
            })
        } else if let Some(container) = url.strip_prefix("az://") {
            let container = container.trim_end_matches('/');
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                base: format!("az://{container}"),
            })
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
            let store = LocalFileSystem::new_with_prefix(path)
                .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;
            Ok(Self {
                store: Arc::new(store),
                base: format!("file://{}", path.trim_end_matches('/')),
            })
        }
    }

    /// Wrap an existing store, used by tests and embedders
    pub fn from_store(store: Arc<dyn ObjectStore>, base: impl Into<String>) -> Self {
        Self {
            store,
            base: base.into(),
        }
    }

    /// The display base for this destination
    pub fn base(&self) -> &str {
        &self.base
    }
}

// ============================================================================
// Uploader
// ============================================================================

/// Uploads encoded artifacts with bounded exponential-backoff retry
///
/// Only transient store failures consume the retry budget; permission
/// and validation errors fail immediately.
#[derive(Debug)]
pub struct ObjectStoreUploader {
    destination: Destination,
    prefix: String,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl ObjectStoreUploader {
    /// Create an uploader writing under `prefix` at the destination
    pub fn new(destination: Destination, prefix: impl Into<String>, max_retries: u32) -> Self {
        Self {
            destination,
            prefix: prefix.into(),
            max_retries,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Override the backoff schedule
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Upload one artifact, returning its full storage location
    pub async fn upload(&self, artifact: &EncodedArtifact) -> Result<String> {
        let key = part_key(&self.prefix, &artifact.object_type, artifact.part_index);
        let path = ObjectPath::from(key.as_str());

        let mut attempt = 0;
        loop {
            match self
                .destination
                .store
                .put(&path, artifact.bytes.clone().into())
                .await
            {
                Ok(_) => {
                    debug!(
                        "Uploaded {key} ({} records, {} bytes)",
                        artifact.record_count,
                        artifact.bytes.len()
                    );
                    return Ok(format!("{}/{key}", self.destination.base));
                }
                Err(e) if is_retryable_store(&e) && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Upload of {key} failed ({e}), attempt {}/{}, retrying in {delay:?}",
                        attempt + 1,
                        self.max_retries + 1,
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if is_retryable_store(&e) => {
                    return Err(Error::upload(format!(
                        "{key}: retries exhausted after {} attempts: {e}",
                        attempt + 1
                    )));
                }
                Err(e) => {
                    return Err(Error::upload(format!("{key}: {e}")));
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.initial_backoff * factor, self.max_backoff)
    }
}
