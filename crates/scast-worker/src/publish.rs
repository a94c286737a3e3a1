//! Platform delivery stage.
//!
//! Gated by the externally supplied privacy decision: a blocked artifact
//! never leaves storage. Otherwise the resumable upload is driven to
//! completion and the platform's processing is polled to a terminal
//! state, with every transition persisted.

use std::path::Path;

use tokio::sync::watch;

use scast_models::{PipelineConfig, PublishMetadata, PublishStatus, RenderId};
use scast_platform::{poll_until_terminal, PlatformClient};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::RenderLogger;
use crate::metadata::MetadataStore;

/// Result of the publish stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    /// Terminal publish status
    pub status: PublishStatus,
    /// Durable platform video identifier, when delivered
    pub platform_video_id: Option<String>,
}

/// Deliver a rendered artifact to the hosting platform.
pub async fn publish_artifact(
    platform: &PlatformClient,
    store: &dyn MetadataStore,
    render_id: &RenderId,
    artifact_path: &Path,
    total_bytes: u64,
    metadata: &PublishMetadata,
    config: &PipelineConfig,
    logger: &RenderLogger,
    cancel: Option<watch::Receiver<bool>>,
) -> WorkerResult<PublishOutcome> {
    use validator::Validate;
    if let Err(e) = metadata.validate() {
        let message = format!("invalid publish metadata: {e}");
        fail_publish(store, render_id, &message).await;
        return Err(WorkerError::config_error(message));
    }

    if !metadata.privacy.allows_upload() {
        logger.log_completion("publication withheld by compliance decision");
        store
            .set_publish_status(
                render_id,
                PublishStatus::Blocked,
                Some("publication withheld by compliance decision".to_string()),
            )
            .await?;
        return Ok(PublishOutcome {
            status: PublishStatus::Blocked,
            platform_video_id: None,
        });
    }

    store
        .set_publish_status(render_id, PublishStatus::Uploading, None)
        .await?;
    logger.log_start(&format!("uploading {total_bytes} bytes to platform"));

    let upload_result = async {
        let mut session = platform.create_session(metadata, total_bytes).await?;
        platform
            .upload_file(
                &mut session,
                artifact_path,
                config.platform_chunk_size,
                config.chunk_timeout_secs,
                cancel,
            )
            .await
            .map(|video_id| (video_id, session.degraded_acks))
    }
    .await;

    let (video_id, degraded_acks) = match upload_result {
        Ok(ok) => ok,
        Err(e) => {
            fail_publish(store, render_id, &e.to_string()).await;
            return Err(e.into());
        }
    };

    if degraded_acks > 0 {
        logger.log_warning(&format!(
            "{degraded_acks} chunk acknowledgements lacked a Range header"
        ));
    }

    store
        .set_platform_video_id(render_id, video_id.clone())
        .await?;
    store
        .set_publish_status(render_id, PublishStatus::Processing, None)
        .await?;
    logger.log_progress(&format!("upload complete, platform id {video_id}"));

    let status = match poll_until_terminal(
        platform,
        &video_id,
        config.status_poll_interval_secs,
        config.status_poll_timeout_secs,
    )
    .await
    {
        Ok(status) => status,
        Err(e) => {
            fail_publish(store, render_id, &e.to_string()).await;
            return Err(e.into());
        }
    };

    if status.is_success() {
        store
            .set_publish_status(render_id, PublishStatus::Uploaded, None)
            .await?;
        logger.log_completion("platform processing succeeded");
        Ok(PublishOutcome {
            status: PublishStatus::Uploaded,
            platform_video_id: Some(video_id),
        })
    } else {
        let reason = status
            .failure_reason
            .unwrap_or_else(|| "platform processing failed".to_string());
        fail_publish(store, render_id, &reason).await;
        Err(WorkerError::PublishFailed(reason))
    }
}

/// Record a publish failure without masking the original error.
async fn fail_publish(store: &dyn MetadataStore, render_id: &RenderId, message: &str) {
    if let Err(e) = store
        .set_publish_status(render_id, PublishStatus::Error, Some(message.to_string()))
        .await
    {
        tracing::warn!(
            render_id = %render_id,
            error = %e,
            "Failed to record publish error status"
        );
    }
}
