//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video asset creation and owner-only reads with presigned playback URLs
//! - Streaming video uploads through the upload pipeline
//! - Thumbnail upload and serving
//! - HS256 bearer token verification
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, TokenVerifier};
pub use config::{ApiConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, StateParts};
