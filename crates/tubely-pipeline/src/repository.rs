//! Asset metadata store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tubely_models::{AssetId, VideoAsset};

use crate::error::{StoreError, StoreResult};

/// Key-value store for asset records.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn create(&self, asset: VideoAsset) -> StoreResult<VideoAsset>;

    async fn get(&self, id: &AssetId) -> StoreResult<VideoAsset>;

    /// Replace an existing record. Unknown ids are `NotFound`.
    async fn update(&self, asset: &VideoAsset) -> StoreResult<()>;
}

/// Process-local repository.
#[derive(Default)]
pub struct InMemoryAssetRepository {
    assets: RwLock<HashMap<AssetId, VideoAsset>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn create(&self, asset: VideoAsset) -> StoreResult<VideoAsset> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(&asset.id) {
            return Err(StoreError::backend(format!("video {} already exists", asset.id)));
        }
        assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn get(&self, id: &AssetId) -> StoreResult<VideoAsset> {
        self.assets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn update(&self, asset: &VideoAsset) -> StoreResult<()> {
        match self.assets.write().await.get_mut(&asset.id) {
            Some(existing) => {
                *existing = asset.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(asset.id)),
        }
    }
}
