//! Object store abstraction.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// A signed, time-limited GET URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    pub url: String,
    /// When the signature was produced.
    pub issued_at: DateTime<Utc>,
    /// When this URL stops working.
    pub expires_at: DateTime<Utc>,
    /// Expiry in seconds from issuance.
    pub expires_in_secs: u64,
}

impl PresignedUrl {
    /// Stamp a freshly signed URL with issuance and expiry times.
    pub fn issued_now(url: impl Into<String>, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        let expires_at = issued_at + chrono::Duration::from_std(ttl).unwrap_or_default();

        Self {
            url: url.into(),
            issued_at,
            expires_at,
            expires_in_secs: ttl.as_secs(),
        }
    }
}

/// Remote object storage used by the upload pipeline.
///
/// Implementations are shared across concurrent uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `bucket/key` with the given content type.
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Generate a presigned GET URL valid for `ttl`.
    async fn presign_get(&self, bucket: &str, key: &str, ttl: Duration)
        -> StorageResult<PresignedUrl>;

    /// Delete an object.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// Reject empty bucket names and keys before they reach a backend.
pub(crate) fn validate_target(bucket: &str, key: &str) -> StorageResult<()> {
    if bucket.is_empty() {
        return Err(StorageError::InvalidKey("bucket name is empty".to_string()));
    }
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presigned_url_expiry() {
        let url = PresignedUrl::issued_now("https://example.com/x", Duration::from_secs(900));
        assert_eq!(url.expires_in_secs, 900);
        assert_eq!((url.expires_at - url.issued_at).num_seconds(), 900);
    }

    #[test]
    fn test_validate_target() {
        assert!(validate_target("bucket", "landscape/a.mp4").is_ok());
        assert!(validate_target("", "a.mp4").is_err());
        assert!(validate_target("bucket", "").is_err());
        assert!(validate_target("bucket", "/abs.mp4").is_err());
        assert!(validate_target("bucket", "a/../b.mp4").is_err());
    }
}
