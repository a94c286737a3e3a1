//! Worker error types.
//!
//! Aggregates the crate errors into the pipeline's failure taxonomy:
//! caller errors (validation, never retried), transient infrastructure
//! errors (retried with bounded backoff), render-engine failures
//! (surfaced with diagnostics, not retried automatically) and protocol
//! errors (session aborted, never left half-open).

use thiserror::Error;

use scast_media::{MediaError, ValidationError};
use scast_platform::PlatformError;
use scast_sandbox::SandboxError;
use scast_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid render request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Render engine failed: {message}")]
    RenderEngine {
        message: String,
        /// Tail of the engine's diagnostic stream
        diagnostics: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Platform rejected the video: {0}")]
    PublishFailed(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a render-engine failure carrying the captured diagnostics.
    pub fn render_engine(message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::RenderEngine {
            message: message.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Caller error: fails the render immediately, never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkerError::Validation(_) | WorkerError::Media(MediaError::Validation(_))
        )
    }

    /// Engine exited non-zero or the output failed post-render
    /// verification. Not retried automatically: re-running a multi-minute
    /// render on a transient failure is expensive, so the caller decides.
    pub fn is_render_engine(&self) -> bool {
        matches!(self, WorkerError::RenderEngine { .. })
    }

    /// Unexpected protocol response from a transport; the session has
    /// been aborted.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            WorkerError::Platform(
                PlatformError::Protocol { .. }
                    | PlatformError::InvalidRangeHeader(_)
                    | PlatformError::OffsetRegression { .. }
            )
        )
    }

    /// Transient infrastructure failure worth a bounded retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Sandbox(e) => e.is_retryable(),
            WorkerError::Storage(
                StorageError::UploadFailed(_)
                | StorageError::PartFailed { .. }
                | StorageError::AwsSdk(_),
            ) => true,
            WorkerError::Platform(PlatformError::Http(_)) => true,
            _ => false,
        }
    }
}
