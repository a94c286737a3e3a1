//! Render pipeline worker binary.
//!
//! Reads a render job document (JSON path as the first argument), runs
//! the pipeline, and prints the outcome record as JSON on stdout.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scast_platform::PlatformClient;
use scast_sandbox::SandboxClient;
use scast_storage::StorageClient;
use scast_worker::{
    JsonFileMetadataStore, MetadataStore, RenderJob, RenderPipeline, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("scast=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting scast-worker");

    if let Err(e) = run().await {
        error!("Worker failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let job_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: scast-worker <job.json>"))?;

    let job: RenderJob = serde_json::from_slice(&tokio::fs::read(&job_path).await?)?;
    let render_id = job.render_id();

    let config = WorkerConfig::from_env()?;
    info!(render_id = %render_id, work_dir = %config.work_dir, "Worker config loaded");

    let sandbox = SandboxClient::from_env()?;
    let storage = StorageClient::from_env().await?;
    let platform = PlatformClient::from_env()?;
    let metadata: Arc<dyn MetadataStore> = Arc::new(JsonFileMetadataStore::new(format!(
        "{}/metadata",
        config.work_dir
    )));

    // Cooperative cancellation: ctrl-c tears down the sandbox and aborts
    // any in-flight upload session instead of leaving them live.
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling render");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = RenderPipeline::new(config, sandbox, storage, platform, metadata.clone())
        .with_cancel(cancel_rx);

    let outcome = pipeline
        .run(render_id.clone(), job.request, job.publish)
        .await;

    // The persisted record carries the terminal status either way
    let record = metadata.get(&render_id).await?;

    match outcome {
        Ok(outcome) => {
            info!(
                render_id = %outcome.render_id,
                storage_key = %outcome.storage_key,
                publish_status = %outcome.publish.status,
                "Render complete"
            );
            if let Some(record) = record {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Ok(())
        }
        Err(e) => {
            if let Some(record) = record {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Err(e.into())
        }
    }
}
