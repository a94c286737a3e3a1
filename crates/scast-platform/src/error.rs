//! Platform transport error types.

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors that can occur while delivering to the hosting platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Failed to configure platform client: {0}")]
    ConfigError(String),

    #[error("Upload session creation failed: {0}")]
    SessionCreateFailed(String),

    #[error("Session response carried no upload URL")]
    MissingUploadUrl,

    #[error("Platform returned unexpected status {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Unparseable range acknowledgement: {0}")]
    InvalidRangeHeader(String),

    #[error("Server acknowledgement went backwards: {acknowledged} after {previous}")]
    OffsetRegression { acknowledged: u64, previous: u64 },

    #[error("Session completed with {acknowledged} of {total} bytes acknowledged")]
    Incomplete { acknowledged: u64, total: u64 },

    #[error("Processing did not reach a terminal state within {0} seconds")]
    PollTimeout(u64),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn protocol(status: u16, message: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            message: message.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
