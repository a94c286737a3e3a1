//! Structured render logging utilities.

use tracing::{error, info, warn, Span};

use scast_models::RenderId;

/// Logger for one render's lifecycle, keyed by render id and stage.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    render_id: String,
    stage: String,
}

impl RenderLogger {
    /// Create a logger for a render stage (e.g. "render", "store",
    /// "publish").
    pub fn new(render_id: &RenderId, stage: &str) -> Self {
        Self {
            render_id: render_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// A logger for a different stage of the same render.
    pub fn stage(&self, stage: &str) -> Self {
        Self {
            render_id: self.render_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            stage = %self.stage,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            stage = %self.stage,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            render_id = %self.render_id,
            stage = %self.stage,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            render_id = %self.render_id,
            stage = %self.stage,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            stage = %self.stage,
            "Stage completed: {}", message
        );
    }

    /// Create a tracing span for this stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render_stage",
            render_id = %self.render_id,
            stage = %self.stage
        )
    }
}
