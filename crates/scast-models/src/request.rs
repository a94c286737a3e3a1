//! Render request types.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::asset::{AudioAsset, SlideAsset};

/// Output orientation for the composed video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// 1080x1920, for short-form vertical platforms
    #[default]
    Portrait,
    /// 1920x1080
    Landscape,
}

impl Orientation {
    /// Output frame dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Orientation::Portrait => (1080, 1920),
            Orientation::Landscape => (1920, 1080),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The immutable input to one render.
///
/// Invariants (checked by the validator before any external call):
/// slide and audio counts are equal, no `slide_index` is duplicated in
/// either list, and every narration duration is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRequest {
    /// Slide images in deck order
    pub slides: Vec<SlideAsset>,
    /// Narration clips, one per slide
    pub audio: Vec<AudioAsset>,
    /// Output orientation
    #[serde(default)]
    pub orientation: Orientation,
    /// Date burned into the final composed frame
    pub overlay_date: NaiveDate,
}

impl RenderRequest {
    /// Number of slides in the request.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}
