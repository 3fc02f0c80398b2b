//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use tubely_media::{ProcessRunner, TokioProcessRunner};
use tubely_pipeline::{
    AssetLocks, AssetRepository, InMemoryAssetRepository, InMemoryThumbnailStore, ThumbnailService,
    ThumbnailStore, UploadConfig, UploadPipeline,
};
use tubely_storage::{InMemoryObjectStore, ObjectStore, PresignedUrlIssuer, S3Client};

use crate::auth::TokenVerifier;
use crate::config::{ApiConfig, StorageBackend};

/// Bucket name used with the in-memory backend.
const MEMORY_BUCKET: &str = "tubely-local";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub tokens: Arc<TokenVerifier>,
    pub repository: Arc<dyn AssetRepository>,
    pub pipeline: UploadPipeline,
    pub issuer: PresignedUrlIssuer,
    pub thumbnails: ThumbnailService,
}

/// Collaborators the state is assembled from.
pub struct StateParts {
    pub upload: UploadConfig,
    pub bucket: String,
    pub store: Arc<dyn ObjectStore>,
    pub runner: Arc<dyn ProcessRunner>,
    pub repository: Arc<dyn AssetRepository>,
    pub thumbnails: Arc<dyn ThumbnailStore>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let upload = UploadConfig::from_env();

        let (store, bucket): (Arc<dyn ObjectStore>, String) = match config.storage_backend {
            StorageBackend::S3 => {
                let client = S3Client::from_env().await?;
                let bucket = client.bucket().to_string();
                (Arc::new(client), bucket)
            }
            StorageBackend::Memory => {
                warn!("Using in-memory object storage; uploads are lost on restart");
                (
                    Arc::new(InMemoryObjectStore::default()),
                    MEMORY_BUCKET.to_string(),
                )
            }
        };
        info!(bucket = %bucket, "Object storage ready");

        let runner = Arc::new(TokioProcessRunner::new().with_timeout(upload.tool_timeout));

        Ok(Self::from_parts(
            config,
            StateParts {
                upload,
                bucket,
                store,
                runner,
                repository: Arc::new(InMemoryAssetRepository::new()),
                thumbnails: Arc::new(InMemoryThumbnailStore::new()),
            },
        ))
    }

    /// Wire state from explicit collaborators.
    pub fn from_parts(config: ApiConfig, parts: StateParts) -> Self {
        let locks = AssetLocks::new();

        let issuer = PresignedUrlIssuer::new(parts.store.clone(), parts.upload.presign_ttl);
        let thumbnails = ThumbnailService::new(
            parts.repository.clone(),
            parts.thumbnails,
            locks.clone(),
            config.public_base_url.clone(),
            parts.upload.max_thumbnail_bytes,
        );
        let pipeline = UploadPipeline::new(
            parts.upload,
            parts.bucket,
            parts.runner,
            parts.store,
            parts.repository.clone(),
            locks,
        );

        Self {
            tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            config,
            repository: parts.repository,
            pipeline,
            issuer,
            thumbnails,
        }
    }
}
