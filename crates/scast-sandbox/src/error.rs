//! Sandbox client error types.

use thiserror::Error;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors that can occur while driving a render sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to configure sandbox client: {0}")]
    ConfigError(String),

    #[error("Sandbox creation failed: {0}")]
    CreateFailed(String),

    #[error("Sandbox API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Asset fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("File read failed for {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("Execution timed out after {0} seconds")]
    Timeout(u64),

    #[error("Sandbox session already closed")]
    SessionClosed,

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn create_failed(msg: impl Into<String>) -> Self {
        Self::CreateFailed(msg.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this failure is worth retrying (sandbox allocation is a
    /// scarce, occasionally flaky external resource).
    pub fn is_retryable(&self) -> bool {
        match self {
            SandboxError::CreateFailed(_)
            | SandboxError::FetchFailed { .. }
            | SandboxError::Http(_) => true,
            SandboxError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
