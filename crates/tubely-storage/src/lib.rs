//! S3 object storage for uploaded assets.
//!
//! This crate provides:
//! - An object store trait with S3 and in-memory backends
//! - The `{aspect}/{random}{ext}` key scheme
//! - `bucket,key` locator encoding for asset records
//! - Presigned playback URLs

pub mod client;
pub mod error;
pub mod keys;
pub mod locator;
pub mod memory;
pub mod presign;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use keys::{build_key, media_type_extension, random_asset_name};
pub use locator::{decode_locator, encode_locator, RemoteObject, StorageLocator};
pub use memory::{InMemoryObjectStore, StoredObject};
pub use presign::{
    PresignedUrlIssuer, SignedAsset, DEFAULT_PRESIGN_TTL_SECS, MAX_PRESIGN_TTL_SECS,
};
pub use store::{ObjectStore, PresignedUrl};
