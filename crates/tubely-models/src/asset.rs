//! Video asset records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::aspect::AspectClass;

/// Unique identifier for a video asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetId(pub Uuid);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AssetId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identifier of the user that owns an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Video asset stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Unique asset ID
    pub id: AssetId,

    /// Owner
    pub user_id: UserId,

    /// Video title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Declared media type of the uploaded video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Aspect class probed at upload time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<AspectClass>,

    /// Encoded storage locator (`bucket,key`). Replaced by a presigned URL
    /// when the record is handed to a client.
    #[serde(default)]
    pub video_url: Option<String>,

    /// Thumbnail URL served by the API
    #[serde(default)]
    pub thumbnail_url: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoAsset {
    /// Create a new draft asset with no uploaded video.
    pub fn new(user_id: UserId, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: AssetId::new(),
            user_id,
            title: title.into(),
            description: description.into(),
            media_type: None,
            aspect: None,
            video_url: None,
            thumbnail_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check ownership.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id == *user_id
    }

    /// Record a completed video upload.
    pub fn with_video(
        mut self,
        locator: impl Into<String>,
        media_type: impl Into<String>,
        aspect: AspectClass,
    ) -> Self {
        self.video_url = Some(locator.into());
        self.media_type = Some(media_type.into());
        self.aspect = Some(aspect);
        self.updated_at = Utc::now();
        self
    }

    /// Record a thumbnail URL.
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_generation() {
        let id1 = AssetId::new();
        let id2 = AssetId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_asset_id_parse() {
        let id = AssetId::new();
        assert_eq!(id.to_string().parse::<AssetId>().unwrap(), id);
        assert!("not-a-uuid".parse::<AssetId>().is_err());
    }

    #[test]
    fn test_new_asset_has_no_video() {
        let owner = UserId::new();
        let asset = VideoAsset::new(owner, "Boots", "A video about boots");

        assert!(asset.is_owned_by(&owner));
        assert!(!asset.is_owned_by(&UserId::new()));
        assert!(asset.video_url.is_none());
        assert!(asset.aspect.is_none());
        assert_eq!(asset.created_at, asset.updated_at);
    }

    #[test]
    fn test_with_video() {
        let asset = VideoAsset::new(UserId::new(), "t", "d");
        let created = asset.created_at;
        let asset = asset.with_video("bucket,landscape/abc.mp4", "video/mp4", AspectClass::Landscape);

        assert_eq!(asset.video_url.as_deref(), Some("bucket,landscape/abc.mp4"));
        assert_eq!(asset.media_type.as_deref(), Some("video/mp4"));
        assert_eq!(asset.aspect, Some(AspectClass::Landscape));
        assert_eq!(asset.created_at, created);
        assert!(asset.updated_at >= created);
    }

    #[test]
    fn test_json_shape() {
        let asset = VideoAsset::new(UserId::new(), "t", "d");
        let value = serde_json::to_value(&asset).unwrap();

        assert!(value.get("user_id").is_some());
        assert!(value.get("video_url").unwrap().is_null());
        assert!(value.get("aspect").is_none());
    }

    #[test]
    fn test_schema_generation() {
        let schema = schemars::schema_for!(VideoAsset);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("video_url"));
    }
}
