//! Slide and narration asset references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A reference to one rendered slide image.
///
/// `slide_index` is the stable ordering key across the whole pipeline and
/// must be unique within a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SlideAsset {
    /// URL or path of the slide image
    pub location_ref: String,
    /// Position of this slide in the deck (0-based)
    pub slide_index: u32,
}

/// A narration clip for one slide.
///
/// Every `SlideAsset.slide_index` must have exactly one corresponding
/// `AudioAsset.slide_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioAsset {
    /// URL or path of the narration audio
    pub location_ref: String,
    /// Slide this clip narrates
    pub slide_index: u32,
    /// Narration length in milliseconds (must be positive)
    pub duration_ms: u64,
}

impl SlideAsset {
    /// Create a new slide asset reference.
    pub fn new(location_ref: impl Into<String>, slide_index: u32) -> Self {
        Self {
            location_ref: location_ref.into(),
            slide_index,
        }
    }

    /// Local filename for this slide inside a render working directory.
    pub fn local_name(&self) -> String {
        format!("slide_{:03}.png", self.slide_index)
    }
}

impl AudioAsset {
    /// Create a new narration asset reference.
    pub fn new(location_ref: impl Into<String>, slide_index: u32, duration_ms: u64) -> Self {
        Self {
            location_ref: location_ref.into(),
            slide_index,
            duration_ms,
        }
    }

    /// Local filename for this clip inside a render working directory.
    pub fn local_name(&self) -> String {
        format!("narration_{:03}.mp3", self.slide_index)
    }

    /// Narration length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}
