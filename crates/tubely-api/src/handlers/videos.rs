//! Video asset handlers.

use std::io;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use futures_util::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::info;

use tubely_models::VideoAsset;
use tubely_pipeline::UploadRequest;
use tubely_storage::SignedAsset;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::VideoId;
use crate::state::AppState;

/// Multipart field carrying the video file.
pub const VIDEO_FIELD: &str = "video";

/// Create video request.
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Create a draft video owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<VideoAsset>)> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    let asset = state
        .repository
        .create(VideoAsset::new(user.user_id, title, request.description))
        .await?;

    info!(video_id = %asset.id, user_id = %user.user_id, "Video created");
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Get a video with a freshly signed playback URL.
pub async fn get_video(
    VideoId(video_id): VideoId,
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<SignedAsset>> {
    let asset = state.repository.get(&video_id).await?;
    if !asset.is_owned_by(&user.user_id) {
        return Err(ApiError::unauthorized("not the owner of this video"));
    }

    let signed = state.issuer.sign_asset(asset).await?;
    Ok(Json(signed))
}

/// Upload the video file for an existing asset.
///
/// The `video` field is streamed straight into the pipeline's staging file.
pub async fn upload_video(
    VideoId(video_id): VideoId,
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<VideoAsset>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let media_type = field.content_type().unwrap_or_default().to_string();
        let body = StreamReader::new(Box::pin(
            field.map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
        ));

        let report = state
            .pipeline
            .run(UploadRequest {
                asset_id: video_id,
                caller: user.user_id,
                media_type,
                declared_len: None,
                body,
            })
            .await?;

        return Ok(Json(report.asset));
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field \"{}\"",
        VIDEO_FIELD
    )))
}
