//! Upload pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use tubely_storage::DEFAULT_PRESIGN_TTL_SECS;

/// 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// 10 MiB.
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

pub const SUPPORTED_MEDIA_TYPE: &str = "video/mp4";

/// Upload pipeline configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Largest accepted upload body
    pub max_upload_bytes: u64,
    /// Largest accepted thumbnail
    pub max_thumbnail_bytes: u64,
    /// Lifetime of presigned playback URLs
    pub presign_ttl: Duration,
    /// Upper bound for a single ffprobe/ffmpeg run
    pub tool_timeout: Duration,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    /// Directory staged uploads are written to
    pub staging_dir: PathBuf,
    /// The one container type uploads must declare
    pub supported_media_type: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
            presign_ttl: Duration::from_secs(DEFAULT_PRESIGN_TTL_SECS),
            tool_timeout: Duration::from_secs(300),
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            staging_dir: std::env::temp_dir(),
            supported_media_type: SUPPORTED_MEDIA_TYPE.to_string(),
        }
    }
}

impl UploadConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            max_thumbnail_bytes: std::env::var("MAX_THUMBNAIL_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_thumbnail_bytes),
            presign_ttl: Duration::from_secs(
                std::env::var("PRESIGN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_PRESIGN_TTL_SECS),
            ),
            tool_timeout: Duration::from_secs(
                std::env::var("TOOL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            ffprobe_path: std::env::var("FFPROBE_PATH").unwrap_or(defaults.ffprobe_path),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            staging_dir: std::env::var("UPLOAD_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            supported_media_type: defaults.supported_media_type,
        }
    }
}

/// Essence of a media type header value: parameters dropped, lowercased.
///
/// `"Video/MP4; codecs=avc1"` becomes `"video/mp4"`.
pub fn media_type_essence(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
