//! Platform processing status polling.
//!
//! After the resumable upload completes the platform transcodes the
//! video asynchronously; the status API is polled at a fixed interval
//! until a terminal state or the budget runs out.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};
use crate::resumable::PlatformClient;

/// Status report returned by the platform's status-query API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    /// Upload state ("uploaded", "failed", ...)
    pub upload_status: String,
    /// Processing state once the upload landed
    #[serde(default)]
    pub processing_status: Option<String>,
    /// Failure detail when something went wrong
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl PlatformStatus {
    /// Whether the platform has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        if self.upload_status == "failed" {
            return true;
        }
        matches!(
            self.processing_status.as_deref(),
            Some("succeeded") | Some("failed")
        )
    }

    /// Whether the video is fully processed and live.
    pub fn is_success(&self) -> bool {
        self.processing_status.as_deref() == Some("succeeded")
    }
}

/// Poll the status API until terminal or the timeout elapses.
pub async fn poll_until_terminal(
    client: &PlatformClient,
    video_id: &str,
    interval_secs: u64,
    timeout_secs: u64,
) -> PlatformResult<PlatformStatus> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        let status = client.query_status(video_id).await?;
        debug!(
            video_id,
            upload_status = %status.upload_status,
            processing_status = ?status.processing_status,
            "Polled platform status"
        );

        if status.is_terminal() {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            return Err(PlatformError::PollTimeout(timeout_secs));
        }

        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}
