//! Rendered artifact metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Probe metadata for a successfully rendered artifact.
///
/// Recorded alongside the storage key once the render executor has
/// verified the output, and consumed by the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Frame rate
    pub fps: f64,
    /// Video codec (e.g. "h264")
    pub video_codec: String,
    /// Audio codec (e.g. "aac")
    pub audio_codec: String,
    /// Container format (e.g. "mp4")
    pub container: String,
    /// File size in bytes
    pub size_bytes: u64,
}

impl ArtifactInfo {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}
