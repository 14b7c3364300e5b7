use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a memory's `image_url` is interpreted: a stored image blob, a stored
/// video blob, or an external YouTube link kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Youtube,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Youtube => "youtube",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "youtube" => Ok(MediaType::Youtube),
            other => Err(format!("unknown media type: {}", other)),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text placement variants for a story slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    TextOverlay,
    TextTop,
    TextBottom,
}

impl LayoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::TextOverlay => "text_overlay",
            LayoutType::TextTop => "text_top",
            LayoutType::TextBottom => "text_bottom",
        }
    }
}

impl FromStr for LayoutType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text_overlay" => Ok(LayoutType::TextOverlay),
            "text_top" => Ok(LayoutType::TextTop),
            "text_bottom" => Ok(LayoutType::TextBottom),
            other => Err(format!("unknown layout type: {}", other)),
        }
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Story zoom is user-adjustable but bounded; the API clamps writes the same
/// way the editing UI did.
pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 2.0;

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(ZOOM_MIN, ZOOM_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_round_trip() {
        for s in ["image", "video", "youtube"] {
            assert_eq!(s.parse::<MediaType>().unwrap().as_str(), s);
        }
        assert!("gif".parse::<MediaType>().is_err());
    }

    #[test]
    fn layout_type_round_trip() {
        for s in ["text_overlay", "text_top", "text_bottom"] {
            assert_eq!(s.parse::<LayoutType>().unwrap().as_str(), s);
        }
        assert!("text_center".parse::<LayoutType>().is_err());
    }

    #[test]
    fn zoom_clamped_to_range() {
        assert_eq!(clamp_zoom(0.3), 1.0);
        assert_eq!(clamp_zoom(1.4), 1.4);
        assert_eq!(clamp_zoom(5.0), 2.0);
    }
}
