//! Worker configuration.

use scast_models::{PipelineConfig, RenderEngine};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for extracted artifacts
    pub work_dir: String,
    /// Shared pipeline tunables
    pub pipeline: PipelineConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/scast".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let mut pipeline = PipelineConfig::default();

        if let Ok(engine) = std::env::var("RENDER_ENGINE") {
            pipeline.render_engine = match engine.as_str() {
                "filter_graph" => RenderEngine::FilterGraph,
                "scene_doc" => RenderEngine::SceneDoc,
                other => {
                    return Err(WorkerError::config_error(format!(
                        "unknown RENDER_ENGINE '{other}'"
                    )))
                }
            };
        }

        if let Some(secs) = parse_env("PIPELINE_TRANSITION_SECS") {
            pipeline.transition_secs = secs;
        }
        if let Some(fps) = parse_env("PIPELINE_FPS") {
            pipeline.fps = fps;
        }
        if let Some(bytes) = parse_env("PIPELINE_STORAGE_PART_SIZE") {
            pipeline.storage_part_size = bytes;
        }
        if let Some(bytes) = parse_env("PIPELINE_PLATFORM_CHUNK_SIZE") {
            pipeline.platform_chunk_size = bytes;
        }
        if let Some(secs) = parse_env("PIPELINE_RENDER_TIMEOUT_SECS") {
            pipeline.render_timeout_secs = secs;
        }

        pipeline.check().map_err(WorkerError::config_error)?;

        Ok(Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/scast".to_string()),
            pipeline,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.pipeline.check().is_ok());
        assert_eq!(config.pipeline.render_engine, RenderEngine::FilterGraph);
    }
}
