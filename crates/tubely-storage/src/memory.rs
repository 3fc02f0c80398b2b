//! In-process object store for local development.
//!
//! Selected with `STORAGE_BACKEND=memory`. Objects live until the process
//! exits; presigned URLs point back at the configured base URL and carry
//! a per-call signature so two issues of the same object never match.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_target, ObjectStore, PresignedUrl};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

pub struct InMemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    signatures: AtomicU64,
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            signatures: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://")
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        validate_target(bucket, key)?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", path.display(), e)))?;

        debug!("Stored {} bytes at {}/{}", data.len(), bucket, key);
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> StorageResult<PresignedUrl> {
        validate_target(bucket, key)?;

        let signature = self.signatures.fetch_add(1, Ordering::Relaxed);
        let url = format!(
            "{}/{}/{}?X-Expires={}&X-Signature={:016x}",
            self.base_url,
            bucket,
            key,
            ttl.as_secs(),
            signature
        );
        Ok(PresignedUrl::issued_now(url, ttl))
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        validate_target(bucket, key)?;
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
