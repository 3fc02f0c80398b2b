//! Thumbnail storage and attachment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use tubely_models::{AssetId, UserId, VideoAsset};

use crate::config::media_type_essence;
use crate::error::{StoreResult, UploadError, UploadResult};
use crate::locks::AssetLocks;
use crate::repository::AssetRepository;

/// Raster formats accepted as thumbnails. Thumbnails are served from the
/// API origin, so scriptable types like `image/svg+xml` are not listed.
pub const THUMBNAIL_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Image bytes with their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// Thumbnail bytes keyed by asset.
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    async fn put(&self, id: AssetId, thumbnail: Thumbnail) -> StoreResult<()>;

    async fn get(&self, id: &AssetId) -> StoreResult<Option<Thumbnail>>;

    async fn remove(&self, id: &AssetId) -> StoreResult<()>;
}

#[derive(Default)]
pub struct InMemoryThumbnailStore {
    thumbnails: RwLock<HashMap<AssetId, Thumbnail>>,
}

impl InMemoryThumbnailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThumbnailStore for InMemoryThumbnailStore {
    async fn put(&self, id: AssetId, thumbnail: Thumbnail) -> StoreResult<()> {
        self.thumbnails.write().await.insert(id, thumbnail);
        Ok(())
    }

    async fn get(&self, id: &AssetId) -> StoreResult<Option<Thumbnail>> {
        Ok(self.thumbnails.read().await.get(id).cloned())
    }

    async fn remove(&self, id: &AssetId) -> StoreResult<()> {
        self.thumbnails.write().await.remove(id);
        Ok(())
    }
}

/// Stores thumbnails and points asset records at them.
#[derive(Clone)]
pub struct ThumbnailService {
    repository: Arc<dyn AssetRepository>,
    store: Arc<dyn ThumbnailStore>,
    locks: AssetLocks,
    public_base_url: String,
    max_bytes: u64,
}

impl ThumbnailService {
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        store: Arc<dyn ThumbnailStore>,
        locks: AssetLocks,
        public_base_url: impl Into<String>,
        max_bytes: u64,
    ) -> Self {
        Self {
            repository,
            store,
            locks,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    /// Public URL the thumbnail of `id` is served from.
    pub fn thumbnail_url(&self, id: &AssetId) -> String {
        format!("{}/api/thumbnails/{}", self.public_base_url, id)
    }

    /// Store a thumbnail for an asset owned by `caller` and update its record.
    ///
    /// If the record update fails the stored bytes are removed again.
    pub async fn attach(
        &self,
        asset_id: AssetId,
        caller: UserId,
        media_type: &str,
        data: Vec<u8>,
    ) -> UploadResult<VideoAsset> {
        let media_type = media_type_essence(media_type);
        if !THUMBNAIL_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(UploadError::validation(format!(
                "invalid thumbnail media type: {}",
                media_type
            )));
        }
        if data.is_empty() || data.len() as u64 > self.max_bytes {
            return Err(UploadError::validation(format!(
                "thumbnail must be between 1 and {} bytes",
                self.max_bytes
            )));
        }

        let _guard = self.locks.acquire(asset_id).await;

        let asset = self.repository.get(&asset_id).await?;
        if !asset.is_owned_by(&caller) {
            return Err(UploadError::auth("not the owner of this video"));
        }

        self.store
            .put(asset_id, Thumbnail { data, media_type })
            .await?;

        let updated = asset.with_thumbnail(self.thumbnail_url(&asset_id));
        if let Err(e) = self.repository.update(&updated).await {
            if let Err(cleanup) = self.store.remove(&asset_id).await {
                warn!(asset_id = %asset_id, "Failed to drop thumbnail after update error: {}", cleanup);
            }
            return Err(e.into());
        }

        info!(asset_id = %asset_id, "Thumbnail attached");
        Ok(updated)
    }

    pub async fn fetch(&self, asset_id: &AssetId) -> UploadResult<Thumbnail> {
        self.store
            .get(asset_id)
            .await?
            .ok_or_else(|| UploadError::NotFound(format!("thumbnail for {} not found", asset_id)))
    }
}
