//! Request extractors.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use tubely_models::AssetId;

use crate::error::ApiError;

/// `:video_id` path segment parsed as an asset id. Malformed ids are 400.
#[derive(Debug, Clone, Copy)]
pub struct VideoId(pub AssetId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for VideoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        raw.parse::<AssetId>()
            .map(VideoId)
            .map_err(|_| ApiError::bad_request(format!("Invalid video ID: {}", raw)))
    }
}
