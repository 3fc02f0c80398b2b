//! Presigned read URLs for stored assets.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use tubely_models::VideoAsset;

use crate::error::StorageResult;
use crate::locator::{RemoteObject, StorageLocator};
use crate::store::{ObjectStore, PresignedUrl};

/// Default expiry for playback URLs (15 minutes).
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 900;

/// Longest expiry SigV4 accepts (7 days).
pub const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// An asset whose locator has been swapped for a signed URL.
#[derive(Debug, Clone, Serialize)]
pub struct SignedAsset {
    #[serde(flatten)]
    pub asset: VideoAsset,
    /// Present only when `video_url` was signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url_expires_at: Option<DateTime<Utc>>,
}

impl SignedAsset {
    fn unsigned(asset: VideoAsset) -> Self {
        Self {
            asset,
            video_url_expires_at: None,
        }
    }
}

/// Issues fresh presigned URLs on every call. Nothing is cached.
#[derive(Clone)]
pub struct PresignedUrlIssuer {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl PresignedUrlIssuer {
    /// `ttl` is clamped to `1..=MAX_PRESIGN_TTL_SECS` seconds.
    pub fn new(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        let secs = ttl.as_secs().clamp(1, MAX_PRESIGN_TTL_SECS);
        Self {
            store,
            ttl: Duration::from_secs(secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a GET for `bucket/key` with an explicit expiry.
    pub async fn issue(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<PresignedUrl> {
        self.store.presign_get(bucket, key, ttl).await
    }

    /// Sign a GET for a locator with the configured expiry.
    pub async fn issue_for(&self, locator: &StorageLocator) -> StorageResult<PresignedUrl> {
        self.issue(&locator.bucket, &locator.key, self.ttl).await
    }

    /// Replace an asset's persisted locator with a playable URL.
    ///
    /// Assets without a decodable locator come back untouched. A signing
    /// failure is an error; the raw locator is never handed out.
    pub async fn sign_asset(&self, mut asset: VideoAsset) -> StorageResult<SignedAsset> {
        let locator = match RemoteObject::from(asset.video_url.as_deref()) {
            RemoteObject::Stored(locator) => locator,
            RemoteObject::NoRemoteObject => return Ok(SignedAsset::unsigned(asset)),
        };

        let presigned = self.issue_for(&locator).await?;
        debug!(asset_id = %asset.id, key = %locator.key, "Signed video URL");

        asset.video_url = Some(presigned.url);
        Ok(SignedAsset {
            asset,
            video_url_expires_at: Some(presigned.expires_at),
        })
    }
}
