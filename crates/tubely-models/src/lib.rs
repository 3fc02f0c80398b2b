//! Shared data models for the Tubely backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video asset records and their ids
//! - Aspect classes derived from probed dimensions

pub mod aspect;
pub mod asset;

// Re-export common types
pub use aspect::AspectClass;
pub use asset::{AssetId, UserId, VideoAsset};
