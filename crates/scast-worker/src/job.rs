//! Render job document.
//!
//! The surrounding application enqueues one of these per render; the
//! worker binary also accepts one directly as a JSON file.

use serde::{Deserialize, Serialize};

use scast_models::{PublishMetadata, RenderId, RenderRequest};

/// One unit of work for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Render identifier; generated when absent
    #[serde(default)]
    pub render_id: Option<RenderId>,
    /// The immutable render input
    pub request: RenderRequest,
    /// Platform publication metadata (including the privacy decision)
    pub publish: PublishMetadata,
}

impl RenderJob {
    /// The job's render id, minting one if the caller did not set it.
    pub fn render_id(&self) -> RenderId {
        self.render_id.clone().unwrap_or_default()
    }
}
