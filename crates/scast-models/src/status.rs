//! Render and publish status transitions.
//!
//! These are the persisted state machines the surrounding application
//! observes. Transitions are written by the pipeline as each stage
//! completes; a failed render never reports a partial success.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Render lifecycle: `pending → rendering → rendered | error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Request accepted, no work started
    #[default]
    Pending,
    /// Sandbox render in progress
    Rendering,
    /// Artifact verified and persisted to storage
    Rendered,
    /// Render failed; message recorded alongside
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Pending => "pending",
            RenderStatus::Rendering => "rendering",
            RenderStatus::Rendered => "rendered",
            RenderStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Rendered | RenderStatus::Error)
    }
}

impl std::fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publish lifecycle:
/// `pending → uploading → processing → uploaded | error | blocked`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Artifact rendered but not yet sent to the platform
    #[default]
    Pending,
    /// Resumable upload in flight
    Uploading,
    /// Upload complete, platform-side processing not yet finished
    Processing,
    /// Platform reports the video is live
    Uploaded,
    /// Upload or processing failed
    Error,
    /// Publication withheld by the compliance decision
    Blocked,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Pending => "pending",
            PublishStatus::Uploading => "uploading",
            PublishStatus::Processing => "processing",
            PublishStatus::Uploaded => "uploaded",
            PublishStatus::Error => "error",
            PublishStatus::Blocked => "blocked",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishStatus::Uploaded | PublishStatus::Error | PublishStatus::Blocked
        )
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_status_terminality() {
        assert!(!RenderStatus::Pending.is_terminal());
        assert!(!RenderStatus::Rendering.is_terminal());
        assert!(RenderStatus::Rendered.is_terminal());
        assert!(RenderStatus::Error.is_terminal());
    }

    #[test]
    fn test_publish_status_terminality() {
        assert!(!PublishStatus::Uploading.is_terminal());
        assert!(!PublishStatus::Processing.is_terminal());
        assert!(PublishStatus::Uploaded.is_terminal());
        assert!(PublishStatus::Blocked.is_terminal());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&PublishStatus::Uploading).unwrap(),
            "\"uploading\""
        );
        assert_eq!(
            serde_json::to_string(&RenderStatus::Rendered).unwrap(),
            "\"rendered\""
        );
    }
}
