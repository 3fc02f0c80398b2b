//! Object key scheme.
//!
//! Keys look like `{aspect}/{random}{ext}`, e.g.
//! `landscape/q1w2...Zx.mp4`. The random part is 32 bytes of OS randomness,
//! base64url-encoded without padding, so it never contains `/` or `,`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use tubely_models::AspectClass;

/// Number of random bytes in an asset name.
pub const ASSET_NAME_BYTES: usize = 32;

/// Extension used when a media type has no usable subtype.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// File extension for a media type: `video/mp4` -> `.mp4`.
///
/// Anything that is not exactly `type/subtype` with both halves present
/// maps to [`FALLBACK_EXTENSION`].
pub fn media_type_extension(media_type: &str) -> String {
    let parts: Vec<&str> = media_type.split('/').collect();
    match parts.as_slice() {
        [kind, subtype] if !kind.is_empty() && !subtype.is_empty() => format!(".{}", subtype),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Fresh random file name carrying the media type's extension.
pub fn random_asset_name(media_type: &str) -> String {
    let mut bytes = [0u8; ASSET_NAME_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    format!(
        "{}{}",
        URL_SAFE_NO_PAD.encode(bytes),
        media_type_extension(media_type)
    )
}

/// Object key for a new upload.
pub fn build_key(aspect: AspectClass, media_type: &str) -> String {
    format!("{}/{}", aspect.as_prefix(), random_asset_name(media_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_media_type_extension() {
        assert_eq!(media_type_extension("video/mp4"), ".mp4");
        assert_eq!(media_type_extension("image/png"), ".png");
        assert_eq!(media_type_extension("video"), ".bin");
        assert_eq!(media_type_extension("video/"), ".bin");
        assert_eq!(media_type_extension("/mp4"), ".bin");
        assert_eq!(media_type_extension("a/b/c"), ".bin");
        assert_eq!(media_type_extension(""), ".bin");
    }

    #[test]
    fn test_random_name_shape() {
        let name = random_asset_name("video/mp4");
        let stem = name.strip_suffix(".mp4").unwrap();

        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(stem.len(), 43);
        assert!(stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(stem).unwrap().len(), ASSET_NAME_BYTES);
    }

    #[test]
    fn test_build_key_prefix() {
        let key = build_key(AspectClass::Portrait, "video/mp4");
        assert!(key.starts_with("portrait/"));
        assert!(key.ends_with(".mp4"));
        assert_eq!(key.matches('/').count(), 1);
        assert!(!key.contains(','));

        assert!(build_key(AspectClass::Other, "video/quicktime").starts_with("other/"));
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<String> = (0..1000).map(|_| random_asset_name("video/mp4")).collect();
        assert_eq!(names.len(), 1000);
    }
}
