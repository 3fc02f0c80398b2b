//! Aspect class derived from probed video dimensions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse orientation bucket for an uploaded video.
///
/// Always derived from probed width/height, never taken from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AspectClass {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    /// Anything else
    Other,
}

impl AspectClass {
    /// Classify pixel dimensions.
    ///
    /// Truncating integer division, exact match only: 1920x1082 is `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let (width, height) = (u64::from(width), u64::from(height));

        if width == 16 * height / 9 {
            AspectClass::Landscape
        } else if height == 16 * width / 9 {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    /// Key prefix used in object storage.
    pub fn as_prefix(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }

    /// Human-readable ratio.
    pub fn ratio(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "16:9",
            AspectClass::Portrait => "9:16",
            AspectClass::Other => "other",
        }
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_prefix())
    }
}

impl FromStr for AspectClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "landscape" | "16:9" => Ok(AspectClass::Landscape),
            "portrait" | "9:16" => Ok(AspectClass::Portrait),
            "other" => Ok(AspectClass::Other),
            _ => Err(format!("Unknown aspect class: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_resolutions() {
        assert_eq!(AspectClass::from_dimensions(1920, 1080), AspectClass::Landscape);
        assert_eq!(AspectClass::from_dimensions(1280, 720), AspectClass::Landscape);
        assert_eq!(AspectClass::from_dimensions(1080, 1920), AspectClass::Portrait);
        assert_eq!(AspectClass::from_dimensions(640, 480), AspectClass::Other);
    }

    #[test]
    fn test_near_widescreen_is_other() {
        assert_eq!(AspectClass::from_dimensions(1920, 1082), AspectClass::Other);
    }

    #[test]
    fn test_zero_dimensions() {
        // 0 == 16*0/9 holds, so the first rule wins.
        assert_eq!(AspectClass::from_dimensions(0, 0), AspectClass::Landscape);
        assert_eq!(AspectClass::from_dimensions(100, 0), AspectClass::Other);
    }

    #[test]
    fn test_prefix_and_parse() {
        for class in [AspectClass::Landscape, AspectClass::Portrait, AspectClass::Other] {
            assert_eq!(class.as_prefix().parse::<AspectClass>().unwrap(), class);
        }
        assert_eq!("9:16".parse::<AspectClass>().unwrap(), AspectClass::Portrait);
        assert!("square".parse::<AspectClass>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AspectClass::Portrait).unwrap();
        assert_eq!(json, "\"portrait\"");
    }
}
