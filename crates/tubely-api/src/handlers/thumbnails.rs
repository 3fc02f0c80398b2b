//! Thumbnail handlers.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

use tubely_models::VideoAsset;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::VideoId;
use crate::state::AppState;

/// Multipart field carrying the thumbnail image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Attach a thumbnail image to a video.
pub async fn upload_thumbnail(
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
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let media_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Unable to read thumbnail: {}", e)))?;

        let asset = state
            .thumbnails
            .attach(video_id, user.user_id, &media_type, data.to_vec())
            .await?;

        return Ok(Json(asset));
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field \"{}\"",
        THUMBNAIL_FIELD
    )))
}

/// Serve a stored thumbnail.
pub async fn get_thumbnail(
    VideoId(video_id): VideoId,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let thumbnail = state.thumbnails.fetch(&video_id).await?;

    Ok((
        [(header::CONTENT_TYPE, thumbnail.media_type)],
        thumbnail.data,
    ))
}
