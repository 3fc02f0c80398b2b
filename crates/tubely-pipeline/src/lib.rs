//! Media upload pipeline.
//!
//! This crate provides:
//! - The staged upload pipeline (stage, probe, fast-start remux, upload, finalize)
//! - Metadata store and thumbnail store interfaces with in-memory backends
//! - Per-asset locking for read-modify-write on asset records
//! - Fakes for tests (`test-util` feature)

pub mod config;
pub mod error;
pub mod locks;
pub mod pipeline;
pub mod repository;
pub mod staging;
pub mod state;
pub mod thumbnails;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{media_type_essence, UploadConfig};
pub use error::{ErrorKind, StoreError, StoreResult, UploadError, UploadResult};
pub use locks::{AssetLockGuard, AssetLocks};
pub use pipeline::{UploadPipeline, UploadReport, UploadRequest};
pub use repository::{AssetRepository, InMemoryAssetRepository};
pub use state::UploadState;
pub use thumbnails::{
    InMemoryThumbnailStore, Thumbnail, ThumbnailService, ThumbnailStore, THUMBNAIL_MEDIA_TYPES,
};
