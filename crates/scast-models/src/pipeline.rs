//! Centralized pipeline configuration.
//!
//! Every tunable the pipeline components share lives here, so no stage
//! re-declares its own copy of a transition duration or chunk size.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::encoding::EncodingConfig;

/// Required granularity of non-final resumable-upload chunks (256 KiB).
pub const UPLOAD_CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Which render engine executes a composition plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderEngine {
    /// FFmpeg filter-graph renderer
    #[default]
    FilterGraph,
    /// Declarative scene-document renderer
    SceneDoc,
}

/// Shared configuration consumed by every pipeline component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    /// Cross-fade duration between consecutive slides, seconds
    #[serde(default = "default_transition_secs")]
    pub transition_secs: f64,

    /// Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Zoom ceiling reached at the end of a slide's pan/zoom animation
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// Render engine executing the composition plan
    #[serde(default)]
    pub render_engine: RenderEngine,

    /// Encoding settings for the composed video
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Multipart storage upload part size, bytes
    #[serde(default = "default_part_size")]
    pub storage_part_size: u64,

    /// Resumable platform upload chunk size, bytes
    /// (must be a multiple of [`UPLOAD_CHUNK_GRANULARITY`])
    #[serde(default = "default_chunk_size")]
    pub platform_chunk_size: u64,

    /// Sandbox creation attempts before giving up
    #[serde(default = "default_sandbox_attempts")]
    pub sandbox_create_attempts: u32,

    /// Maximum concurrent asset fetches into the sandbox
    #[serde(default = "default_fetch_parallelism")]
    pub fetch_parallelism: usize,

    /// Wall-clock budget for one render submission, seconds
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,

    /// Per-chunk HTTP timeout for both transports, seconds
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,

    /// Bounded read size when extracting the artifact from the sandbox, bytes
    #[serde(default = "default_extract_read_size")]
    pub extract_read_size: usize,

    /// Allowed deviation between planned and probed duration, milliseconds
    #[serde(default = "default_duration_tolerance")]
    pub duration_tolerance_ms: u64,

    /// Interval between platform status polls, seconds
    #[serde(default = "default_poll_interval")]
    pub status_poll_interval_secs: u64,

    /// Total budget for platform status polling, seconds
    #[serde(default = "default_poll_timeout")]
    pub status_poll_timeout_secs: u64,
}

fn default_transition_secs() -> f64 {
    1.0
}
fn default_fps() -> u32 {
    30
}
fn default_max_zoom() -> f64 {
    1.2
}
fn default_part_size() -> u64 {
    15 * 1024 * 1024
}
fn default_chunk_size() -> u64 {
    8 * 1024 * 1024
}
fn default_sandbox_attempts() -> u32 {
    3
}
fn default_fetch_parallelism() -> usize {
    4
}
fn default_render_timeout() -> u64 {
    600
}
fn default_chunk_timeout() -> u64 {
    120
}
fn default_extract_read_size() -> usize {
    4 * 1024 * 1024
}
fn default_duration_tolerance() -> u64 {
    500
}
fn default_poll_interval() -> u64 {
    10
}
fn default_poll_timeout() -> u64 {
    900
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transition_secs: default_transition_secs(),
            fps: default_fps(),
            max_zoom: default_max_zoom(),
            render_engine: RenderEngine::default(),
            encoding: EncodingConfig::default(),
            storage_part_size: default_part_size(),
            platform_chunk_size: default_chunk_size(),
            sandbox_create_attempts: default_sandbox_attempts(),
            fetch_parallelism: default_fetch_parallelism(),
            render_timeout_secs: default_render_timeout(),
            chunk_timeout_secs: default_chunk_timeout(),
            extract_read_size: default_extract_read_size(),
            duration_tolerance_ms: default_duration_tolerance(),
            status_poll_interval_secs: default_poll_interval(),
            status_poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl PipelineConfig {
    /// Check invariants the transports depend on.
    ///
    /// Returns a human-readable description of the first violated rule.
    pub fn check(&self) -> Result<(), String> {
        if self.transition_secs <= 0.0 {
            return Err("transition_secs must be positive".into());
        }
        if self.fps == 0 {
            return Err("fps must be positive".into());
        }
        if self.max_zoom < 1.0 {
            return Err("max_zoom must be at least 1.0".into());
        }
        if self.platform_chunk_size == 0
            || self.platform_chunk_size % UPLOAD_CHUNK_GRANULARITY != 0
        {
            return Err(format!(
                "platform_chunk_size must be a positive multiple of {} bytes",
                UPLOAD_CHUNK_GRANULARITY
            ));
        }
        if self.storage_part_size < 5 * 1024 * 1024 {
            return Err("storage_part_size must be at least 5 MiB".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_check() {
        assert!(PipelineConfig::default().check().is_ok());
    }

    #[test]
    fn test_unaligned_chunk_size_rejected() {
        let config = PipelineConfig {
            platform_chunk_size: UPLOAD_CHUNK_GRANULARITY + 1,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_undersized_part_rejected() {
        let config = PipelineConfig {
            storage_part_size: 1024,
            ..Default::default()
        };
        assert!(config.check().is_err());
    }
}
