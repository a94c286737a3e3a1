//! The render pipeline.
//!
//! Single-flow per request: validate → timeline → plan → render →
//! extract → storage transport → platform transport. Each stage runs to
//! completion before the next begins; retries live inside individual
//! stages. All per-render state is local to the invocation, so
//! independent renders can run concurrently with no shared locking.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use scast_media::{build_plan, validate_request, Timeline};
use scast_models::{
    ArtifactInfo, PipelineConfig, PublishMetadata, RenderId, RenderRequest, RenderStatus,
};
use scast_platform::PlatformClient;
use scast_sandbox::SandboxClient;
use scast_storage::{upload_file_multipart, StorageClient};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RenderLogger;
use crate::metadata::MetadataStore;
use crate::publish::{publish_artifact, PublishOutcome};
use crate::render::{execute_render, RenderOutput};

/// Result of one complete pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Render identifier
    pub render_id: RenderId,
    /// Storage key of the persisted artifact
    pub storage_key: String,
    /// Storage key of the poster frame, when one was produced
    pub thumbnail_key: Option<String>,
    /// Verified artifact metadata
    pub artifact: ArtifactInfo,
    /// Publish stage result
    pub publish: PublishOutcome,
}

/// Orchestrates one render from request to platform delivery.
pub struct RenderPipeline {
    config: WorkerConfig,
    sandbox: SandboxClient,
    storage: StorageClient,
    platform: PlatformClient,
    metadata: Arc<dyn MetadataStore>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RenderPipeline {
    pub fn new(
        config: WorkerConfig,
        sandbox: SandboxClient,
        storage: StorageClient,
        platform: PlatformClient,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config,
            sandbox,
            storage,
            platform,
            metadata,
            cancel: None,
        }
    }

    /// Attach a cooperative cancellation signal.
    ///
    /// Cancellation tears down the sandbox (if any) and aborts any
    /// in-flight multipart or resumable session rather than leaving
    /// partial sessions live.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn pipeline_config(&self) -> &PipelineConfig {
        &self.config.pipeline
    }

    /// Run the whole pipeline for one request.
    pub async fn run(
        &self,
        render_id: RenderId,
        request: RenderRequest,
        publish_meta: PublishMetadata,
    ) -> WorkerResult<PipelineOutcome> {
        let logger = RenderLogger::new(&render_id, "pipeline");
        logger.log_start(&format!(
            "{} slides, {} orientation",
            request.slides.len(),
            request.orientation
        ));

        // Fail fast before any external call; a malformed timeline is
        // only detectable later as a corrupted video.
        if let Err(e) = validate_request(&request) {
            let err = WorkerError::from(e);
            self.fail_render(&render_id, &err).await;
            return Err(err);
        }

        self.metadata
            .set_render_status(&render_id, RenderStatus::Rendering, None)
            .await?;

        let (storage_key, thumbnail_key, output) =
            match self.render_and_store(&render_id, &request, &logger).await {
                Ok(ok) => ok,
                Err(err) => {
                    self.fail_render(&render_id, &err).await;
                    return Err(err);
                }
            };

        self.metadata
            .set_artifact(&render_id, storage_key.clone(), output.info.clone())
            .await?;
        self.metadata
            .set_render_status(&render_id, RenderStatus::Rendered, None)
            .await?;
        logger.log_progress(&format!("artifact persisted at {storage_key}"));

        // Publish gating and status transitions live in the publish
        // stage; the render output keeps the extracted file alive until
        // the transport is done with it.
        let publish = publish_artifact(
            &self.platform,
            self.metadata.as_ref(),
            &render_id,
            &output.artifact_path,
            output.info.size_bytes,
            &publish_meta,
            self.pipeline_config(),
            &logger.stage("publish"),
            self.cancel.clone(),
        )
        .await?;

        let artifact = output.info.clone();
        drop(output);

        logger.log_completion("pipeline finished");
        Ok(PipelineOutcome {
            render_id,
            storage_key,
            thumbnail_key,
            artifact,
            publish,
        })
    }

    /// Render in the sandbox and persist the artifact to object storage.
    ///
    /// Returns the render output so the extracted file stays alive for
    /// the platform transport.
    async fn render_and_store(
        &self,
        render_id: &RenderId,
        request: &RenderRequest,
        logger: &RenderLogger,
    ) -> WorkerResult<(String, Option<String>, RenderOutput)> {
        let config = self.pipeline_config();

        let timeline = Timeline::compute(&request.audio, config);
        let plan = build_plan(request, &timeline, config)?;
        logger.log_progress(&format!(
            "timeline computed: {:.1}s nominal across {} slots",
            timeline.total_secs(),
            timeline.len()
        ));

        let render_logger = logger.stage("render");
        let output: RenderOutput = execute_render(
            &self.sandbox,
            request,
            &plan,
            config,
            &render_logger,
            self.cancel.clone(),
        )
        .await?;

        let store_logger = logger.stage("store");
        let storage_key = format!("renders/{}/video.mp4", render_id.as_str());
        store_logger.log_start(&format!(
            "uploading {} bytes in {} MB parts",
            output.info.size_bytes,
            config.storage_part_size / (1024 * 1024)
        ));

        let completed = upload_file_multipart(
            &self.storage,
            &output.artifact_path,
            &storage_key,
            "video/mp4",
            config.storage_part_size,
            self.cancel.clone(),
        )
        .await?;
        store_logger.log_completion(&format!(
            "{} parts uploaded, etag {}",
            completed.part_count, completed.etag
        ));

        // Thumbnail is small enough for a single put and is best-effort
        let thumbnail_key = match &output.thumbnail_path {
            Some(path) => {
                let key = format!("renders/{}/thumbnail.jpg", render_id.as_str());
                match self.storage.upload_file(path, &key, "image/jpeg").await {
                    Ok(()) => Some(key),
                    Err(e) => {
                        store_logger.log_warning(&format!("thumbnail upload failed: {e}"));
                        None
                    }
                }
            }
            None => None,
        };

        Ok((storage_key, thumbnail_key, output))
    }

    /// Record a render failure without masking the original error.
    async fn fail_render(&self, render_id: &RenderId, err: &WorkerError) {
        if let Err(meta_err) = self
            .metadata
            .set_render_status(render_id, RenderStatus::Error, Some(err.to_string()))
            .await
        {
            warn!(
                render_id = %render_id,
                error = %meta_err,
                "Failed to record render error status"
            );
        }
    }
}
