//! Render execution inside the sandbox.
//!
//! Acquires a sandbox session (with a bounded retry budget), stages
//! every declared asset into its filesystem, submits the composition
//! plan to the configured render engine, verifies the produced artifact
//! with an independent probe, and extracts it to the host in bounded
//! reads. The sandbox is torn down on every exit path.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use scast_media::{backend_for, probe, CompositionPlan, RenderInvocation, THUMBNAIL_FILE};
use scast_models::{ArtifactInfo, PipelineConfig, RenderRequest};
use scast_sandbox::{extract_file, ExtractMode, SandboxClient, SandboxError, SandboxGuard};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::RenderLogger;
use crate::retry::{retry_async, RetryConfig};

/// Longest diagnostic tail attached to a render-engine failure.
const DIAGNOSTICS_TAIL_BYTES: usize = 4096;

/// Probe timeout; probing a finished file is fast.
const PROBE_TIMEOUT_SECS: u64 = 60;

/// A rendered, verified, extracted artifact.
///
/// The temp directory owns the extracted files; dropping the output
/// deletes them.
#[derive(Debug)]
pub struct RenderOutput {
    /// Host directory holding the extracted files
    pub work_dir: tempfile::TempDir,
    /// Extracted artifact path
    pub artifact_path: PathBuf,
    /// Extracted poster frame, when one was produced
    pub thumbnail_path: Option<PathBuf>,
    /// Verified artifact metadata
    pub info: ArtifactInfo,
}

/// Execute a composition plan and extract the verified artifact.
pub async fn execute_render(
    client: &SandboxClient,
    request: &RenderRequest,
    plan: &CompositionPlan,
    config: &PipelineConfig,
    logger: &RenderLogger,
    cancel: Option<watch::Receiver<bool>>,
) -> WorkerResult<RenderOutput> {
    check_cancel(&cancel)?;

    // Sandbox allocation is a scarce, occasionally flaky external
    // resource; creation gets the retry budget. A failed render
    // submission below does NOT.
    let create_retry = RetryConfig::new("sandbox_create")
        .with_max_attempts(config.sandbox_create_attempts);
    let mut sandbox = retry_async(&create_retry, SandboxError::is_retryable, || {
        client.create_sandbox()
    })
    .await?;

    logger.log_progress(&format!("sandbox {} acquired", sandbox.id()));

    // Guaranteed teardown on success, failure and cancellation.
    let result = render_in_sandbox(&sandbox, request, plan, config, logger, cancel).await;
    sandbox.close().await;
    result
}

async fn render_in_sandbox(
    sandbox: &SandboxGuard,
    request: &RenderRequest,
    plan: &CompositionPlan,
    config: &PipelineConfig,
    logger: &RenderLogger,
    cancel: Option<watch::Receiver<bool>>,
) -> WorkerResult<RenderOutput> {
    check_cancel(&cancel)?;
    stage_assets(sandbox, request, config).await?;
    logger.log_progress(&format!(
        "{} slides and {} narration clips staged",
        request.slides.len(),
        request.audio.len()
    ));

    check_cancel(&cancel)?;
    let backend = backend_for(config.render_engine);
    let invocation = backend.invocation(plan)?;
    for (path, bytes) in &invocation.extra_files {
        sandbox.write_file(path, bytes.clone()).await?;
    }

    logger.log_progress(&format!("submitting render to {} engine", backend.name()));
    let engine_log = submit_render(sandbox, &invocation, config).await?;
    let diagnostics = tail(&engine_log, DIAGNOSTICS_TAIL_BYTES);

    check_cancel(&cancel)?;
    let info = verify_output(sandbox, plan, &invocation, config, &diagnostics).await?;
    logger.log_progress(&format!(
        "artifact verified: {}x{} {}ms {} bytes",
        info.width, info.height, info.duration_ms, info.size_bytes
    ));

    // Poster frame is best-effort; a missing thumbnail never fails the render
    let thumbnail_ok = generate_thumbnail(sandbox, &invocation, logger).await;

    check_cancel(&cancel)?;
    let work_dir = tempfile::tempdir()?;
    let artifact_path = work_dir.path().join("artifact.mp4");
    let extracted = extract_file(
        sandbox,
        &invocation.output_path,
        &artifact_path,
        config.extract_read_size,
        ExtractMode::Binary,
    )
    .await?;

    if extracted != info.size_bytes {
        return Err(WorkerError::render_engine(
            format!(
                "extracted {extracted} bytes but probe reported {}",
                info.size_bytes
            ),
            diagnostics,
        ));
    }

    let thumbnail_path = if thumbnail_ok {
        let path = work_dir.path().join("thumbnail.jpg");
        match extract_file(
            sandbox,
            THUMBNAIL_FILE,
            &path,
            config.extract_read_size,
            ExtractMode::Binary,
        )
        .await
        {
            Ok(_) => Some(path),
            Err(e) => {
                logger.log_warning(&format!("thumbnail extraction failed: {e}"));
                None
            }
        }
    } else {
        None
    };

    Ok(RenderOutput {
        work_dir,
        artifact_path,
        thumbnail_path,
        info,
    })
}

/// Fetch every declared asset into the sandbox filesystem.
///
/// Fetches run concurrently up to the configured parallelism; order does
/// not affect correctness since each writes a distinct path. Individual
/// fetches get a small retry budget of their own.
async fn stage_assets(
    sandbox: &SandboxGuard,
    request: &RenderRequest,
    config: &PipelineConfig,
) -> WorkerResult<()> {
    let mut assets: Vec<(String, String)> = Vec::with_capacity(request.slides.len() * 2);
    for slide in &request.slides {
        assets.push((slide.location_ref.clone(), slide.local_name()));
    }
    for clip in &request.audio {
        assets.push((clip.location_ref.clone(), clip.local_name()));
    }

    let fetch_retry = RetryConfig::new("asset_fetch");
    let results: Vec<Result<(), SandboxError>> = stream::iter(assets)
        .map(|(url, dest)| {
            let retry = fetch_retry.clone();
            async move {
                retry_async(&retry, SandboxError::is_retryable, || {
                    sandbox.fetch_into(&url, &dest)
                })
                .await
            }
        })
        .buffer_unordered(config.fetch_parallelism)
        .collect()
        .await;

    for result in results {
        result?;
    }
    Ok(())
}

/// Submit the render and return the engine's diagnostic stream.
///
/// A failed submission is surfaced, not retried: re-running a
/// multi-minute render on a transient failure is expensive, and the
/// caller may re-trigger the whole pipeline instead.
async fn submit_render(
    sandbox: &SandboxGuard,
    invocation: &RenderInvocation,
    config: &PipelineConfig,
) -> WorkerResult<String> {
    let output = match sandbox
        .exec(
            &invocation.program,
            &invocation.args,
            config.render_timeout_secs,
        )
        .await
    {
        Ok(output) => output,
        Err(SandboxError::Timeout(secs)) => {
            return Err(WorkerError::render_engine(
                format!("render timed out after {secs} seconds"),
                String::new(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !output.success() {
        return Err(WorkerError::render_engine(
            format!(
                "{} exited with status {}",
                invocation.program, output.exit_code
            ),
            tail(&output.stderr, DIAGNOSTICS_TAIL_BYTES),
        ));
    }

    Ok(output.stderr)
}

/// Probe the output independently; the engine may exit zero while
/// producing a truncated or unplayable file.
async fn verify_output(
    sandbox: &SandboxGuard,
    plan: &CompositionPlan,
    invocation: &RenderInvocation,
    config: &PipelineConfig,
    render_diagnostics: &str,
) -> WorkerResult<ArtifactInfo> {
    let args = scast_media::command::probe_args(&invocation.output_path);
    let output = sandbox.exec("ffprobe", &args, PROBE_TIMEOUT_SECS).await?;

    if !output.success() {
        return Err(WorkerError::render_engine(
            format!("ffprobe exited with status {}", output.exit_code),
            tail(&output.stderr, DIAGNOSTICS_TAIL_BYTES),
        ));
    }

    let summary = probe::parse_probe_output(output.stdout.as_bytes())
        .map_err(|e| WorkerError::render_engine(e.to_string(), render_diagnostics.to_string()))?;

    probe::verify_artifact(&summary, plan, config.duration_tolerance_ms)
        .map_err(|e| WorkerError::render_engine(e.to_string(), render_diagnostics.to_string()))
}

async fn generate_thumbnail(
    sandbox: &SandboxGuard,
    invocation: &RenderInvocation,
    logger: &RenderLogger,
) -> bool {
    let args =
        scast_media::command::thumbnail_args(&invocation.output_path, THUMBNAIL_FILE, 1.0);
    match sandbox.exec("ffmpeg", &args, PROBE_TIMEOUT_SECS).await {
        Ok(output) if output.success() => true,
        Ok(output) => {
            logger.log_warning(&format!(
                "thumbnail generation exited with status {}",
                output.exit_code
            ));
            false
        }
        Err(e) => {
            logger.log_warning(&format!("thumbnail generation failed: {e}"));
            false
        }
    }
}

fn check_cancel(cancel: &Option<watch::Receiver<bool>>) -> WorkerResult<()> {
    if let Some(rx) = cancel {
        if *rx.borrow() {
            return Err(WorkerError::Cancelled);
        }
    }
    Ok(())
}

/// Last `max` bytes of a diagnostic stream, on a char boundary.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scast_media::{build_plan, Timeline};
    use scast_models::{AudioAsset, Orientation, RenderId, SlideAsset};
    use scast_sandbox::SandboxConfig;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> RenderRequest {
        RenderRequest {
            slides: vec![SlideAsset::new("https://cdn/s0.png", 0), SlideAsset::new("https://cdn/s1.png", 1)],
            audio: vec![
                AudioAsset::new("https://cdn/a0.mp3", 0, 10_000),
                AudioAsset::new("https://cdn/a1.mp3", 1, 10_000),
            ],
            orientation: Orientation::Portrait,
            overlay_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    fn plan_for(request: &RenderRequest, config: &PipelineConfig) -> CompositionPlan {
        let timeline = Timeline::compute(&request.audio, config);
        build_plan(request, &timeline, config).unwrap()
    }

    async fn sandbox_client(server: &MockServer) -> SandboxClient {
        SandboxClient::new(SandboxConfig {
            base_url: server.uri(),
            api_token: None,
            template: "render".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn mock_lifecycle(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sandbox_id": "sbx-1"})),
            )
            .mount(server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/sandboxes/sbx-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/fetch"))
            .respond_with(ResponseTemplate::new(200))
            .expect(4)
            .mount(server)
            .await;
    }

    fn exec_response(exit_code: i32, stdout: &str, stderr: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }

    fn probe_json(size: u64) -> String {
        format!(
            r#"{{
                "format": {{"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "21.0", "size": "{size}"}},
                "streams": [
                    {{"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920, "avg_frame_rate": "30/1"}},
                    {{"codec_type": "audio", "codec_name": "aac"}}
                ]
            }}"#
        )
    }

    #[tokio::test]
    async fn test_successful_render_extracts_verified_artifact() {
        let server = MockServer::start().await;
        mock_lifecycle(&server).await;

        let artifact = b"MOVIEBYTES";

        // Render and thumbnail submissions
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/exec"))
            .and(body_partial_json(serde_json::json!({"program": "ffmpeg"})))
            .respond_with(exec_response(0, "", "frame= 630"))
            .mount(&server)
            .await;
        // Probe
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/exec"))
            .and(body_partial_json(serde_json::json!({"program": "ffprobe"})))
            .respond_with(exec_response(0, &probe_json(artifact.len() as u64), ""))
            .mount(&server)
            .await;

        // Extraction: artifact then thumbnail
        Mock::given(method("GET"))
            .and(path("/v1/sandboxes/sbx-1/files/stat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"size": artifact.len()})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/sandboxes/sbx-1/files"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(artifact.to_vec()))
            .mount(&server)
            .await;

        let client = sandbox_client(&server).await;
        let request = sample_request();
        let config = PipelineConfig::default();
        let plan = plan_for(&request, &config);
        let logger = RenderLogger::new(&RenderId::from_string("r-1"), "render");

        let output = execute_render(&client, &request, &plan, &config, &logger, None)
            .await
            .unwrap();

        assert_eq!(output.info.duration_ms, 21_000);
        assert_eq!(
            tokio::fs::read(&output.artifact_path).await.unwrap(),
            artifact
        );
        assert!(output.thumbnail_path.is_some());
    }

    #[tokio::test]
    async fn test_engine_failure_carries_diagnostics_and_tears_down() {
        let server = MockServer::start().await;
        mock_lifecycle(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/exec"))
            .respond_with(exec_response(1, "", "xfade: invalid offset"))
            .mount(&server)
            .await;

        let client = sandbox_client(&server).await;
        let request = sample_request();
        let config = PipelineConfig::default();
        let plan = plan_for(&request, &config);
        let logger = RenderLogger::new(&RenderId::from_string("r-2"), "render");

        let err = execute_render(&client, &request, &plan, &config, &logger, None)
            .await
            .unwrap_err();

        match err {
            WorkerError::RenderEngine { diagnostics, .. } => {
                assert!(diagnostics.contains("invalid offset"));
            }
            other => panic!("expected render engine error, got {other}"),
        }
        // The DELETE expectation on the mock verifies teardown
        server.verify().await;
    }

    #[tokio::test]
    async fn test_truncated_output_fails_verification() {
        let server = MockServer::start().await;
        mock_lifecycle(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/exec"))
            .and(body_partial_json(serde_json::json!({"program": "ffmpeg"})))
            .respond_with(exec_response(0, "", ""))
            .mount(&server)
            .await;
        // Probe reports a 14s file for a 21s plan
        let truncated = probe_json(100).replace("21.0", "14.0");
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes/sbx-1/exec"))
            .and(body_partial_json(serde_json::json!({"program": "ffprobe"})))
            .respond_with(exec_response(0, &truncated, ""))
            .mount(&server)
            .await;

        let client = sandbox_client(&server).await;
        let request = sample_request();
        let config = PipelineConfig::default();
        let plan = plan_for(&request, &config);
        let logger = RenderLogger::new(&RenderId::from_string("r-3"), "render");

        let err = execute_render(&client, &request, &plan, &config, &logger, None)
            .await
            .unwrap_err();
        assert!(err.is_render_engine());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_cancellation_precedes_sandbox_acquisition() {
        let server = MockServer::start().await;
        // A request cancelled up front must never allocate billable compute
        Mock::given(method("POST"))
            .and(path("/v1/sandboxes"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"sandbox_id": "sbx-1"})),
            )
            .expect(0)
            .mount(&server)
            .await;

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let client = sandbox_client(&server).await;
        let request = sample_request();
        let config = PipelineConfig::default();
        let plan = plan_for(&request, &config);
        let logger = RenderLogger::new(&RenderId::from_string("r-4"), "render");

        let err = execute_render(&client, &request, &plan, &config, &logger, Some(rx))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Cancelled));
        server.verify().await;
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("hello", 10), "hello");
        assert_eq!(tail("hello world", 5), "world");
        // Multi-byte char straddling the cut is skipped, not split
        let s = "aé!";
        assert!(tail(s, 2).is_char_boundary(0));
    }
}
