//! Persisted render metadata.
//!
//! The pipeline writes status transitions, the artifact's storage key
//! and probe metadata, and the platform video id. The surrounding
//! application owns the real store; this crate only needs the trait, a
//! JSON-file implementation for standalone workers and an in-memory one
//! for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use scast_models::{ArtifactInfo, PublishStatus, RenderId, RenderStatus};

use crate::error::WorkerResult;

/// Everything persisted about one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRecord {
    /// Render identifier
    pub render_id: String,
    /// Render lifecycle state
    pub render_status: RenderStatus,
    /// Publish lifecycle state
    pub publish_status: PublishStatus,
    /// Storage key of the artifact, once persisted
    pub storage_key: Option<String>,
    /// Probe metadata of the verified artifact
    pub artifact: Option<ArtifactInfo>,
    /// Durable platform video identifier, once delivered
    pub platform_video_id: Option<String>,
    /// Human-readable failure message for terminal error states
    pub error_message: Option<String>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl RenderRecord {
    fn new(render_id: &RenderId) -> Self {
        Self {
            render_id: render_id.to_string(),
            render_status: RenderStatus::Pending,
            publish_status: PublishStatus::Pending,
            storage_key: None,
            artifact: None,
            platform_video_id: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}

/// Sink for render status transitions and artifact metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Record a render status transition.
    async fn set_render_status(
        &self,
        render_id: &RenderId,
        status: RenderStatus,
        message: Option<String>,
    ) -> WorkerResult<()>;

    /// Record the persisted artifact's key and probe metadata.
    async fn set_artifact(
        &self,
        render_id: &RenderId,
        storage_key: String,
        artifact: ArtifactInfo,
    ) -> WorkerResult<()>;

    /// Record a publish status transition.
    async fn set_publish_status(
        &self,
        render_id: &RenderId,
        status: PublishStatus,
        message: Option<String>,
    ) -> WorkerResult<()>;

    /// Record the platform's durable video identifier.
    async fn set_platform_video_id(
        &self,
        render_id: &RenderId,
        video_id: String,
    ) -> WorkerResult<()>;

    /// Read a record back, if one exists.
    async fn get(&self, render_id: &RenderId) -> WorkerResult<Option<RenderRecord>>;
}

/// In-memory store for tests and embedded use.
#[derive(Default, Clone)]
pub struct MemoryMetadataStore {
    records: Arc<Mutex<HashMap<String, RenderRecord>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, render_id: &RenderId, apply: F)
    where
        F: FnOnce(&mut RenderRecord),
    {
        let mut records = self.records.lock().await;
        let record = records
            .entry(render_id.to_string())
            .or_insert_with(|| RenderRecord::new(render_id));
        apply(record);
        record.updated_at = Utc::now();
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn set_render_status(
        &self,
        render_id: &RenderId,
        status: RenderStatus,
        message: Option<String>,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.render_status = status;
            if message.is_some() {
                r.error_message = message;
            }
        })
        .await;
        Ok(())
    }

    async fn set_artifact(
        &self,
        render_id: &RenderId,
        storage_key: String,
        artifact: ArtifactInfo,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.storage_key = Some(storage_key);
            r.artifact = Some(artifact);
        })
        .await;
        Ok(())
    }

    async fn set_publish_status(
        &self,
        render_id: &RenderId,
        status: PublishStatus,
        message: Option<String>,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.publish_status = status;
            if message.is_some() {
                r.error_message = message;
            }
        })
        .await;
        Ok(())
    }

    async fn set_platform_video_id(
        &self,
        render_id: &RenderId,
        video_id: String,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.platform_video_id = Some(video_id);
        })
        .await;
        Ok(())
    }

    async fn get(&self, render_id: &RenderId) -> WorkerResult<Option<RenderRecord>> {
        Ok(self.records.lock().await.get(render_id.as_str()).cloned())
    }
}

/// JSON-file store: one `{render_id}.json` per render under a directory.
///
/// Writes go to a temp file first and are renamed into place, so readers
/// never observe a half-written record.
#[derive(Clone)]
pub struct JsonFileMetadataStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles against the same directory
    lock: Arc<Mutex<()>>,
}

impl JsonFileMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn record_path(&self, render_id: &RenderId) -> PathBuf {
        self.dir.join(format!("{}.json", render_id.as_str()))
    }

    async fn load(&self, render_id: &RenderId) -> WorkerResult<Option<RenderRecord>> {
        let path = self.record_path(render_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, record: &RenderRecord) -> WorkerResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.json", record.render_id));
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn update<F>(&self, render_id: &RenderId, apply: F) -> WorkerResult<()>
    where
        F: FnOnce(&mut RenderRecord),
    {
        let _guard = self.lock.lock().await;
        let mut record = self
            .load(render_id)
            .await?
            .unwrap_or_else(|| RenderRecord::new(render_id));
        apply(&mut record);
        record.updated_at = Utc::now();
        self.store(&record).await
    }
}

#[async_trait]
impl MetadataStore for JsonFileMetadataStore {
    async fn set_render_status(
        &self,
        render_id: &RenderId,
        status: RenderStatus,
        message: Option<String>,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.render_status = status;
            if message.is_some() {
                r.error_message = message;
            }
        })
        .await
    }

    async fn set_artifact(
        &self,
        render_id: &RenderId,
        storage_key: String,
        artifact: ArtifactInfo,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.storage_key = Some(storage_key);
            r.artifact = Some(artifact);
        })
        .await
    }

    async fn set_publish_status(
        &self,
        render_id: &RenderId,
        status: PublishStatus,
        message: Option<String>,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.publish_status = status;
            if message.is_some() {
                r.error_message = message;
            }
        })
        .await
    }

    async fn set_platform_video_id(
        &self,
        render_id: &RenderId,
        video_id: String,
    ) -> WorkerResult<()> {
        self.update(render_id, |r| {
            r.platform_video_id = Some(video_id);
        })
        .await
    }

    async fn get(&self, render_id: &RenderId) -> WorkerResult<Option<RenderRecord>> {
        let _guard = self.lock.lock().await;
        self.load(render_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ArtifactInfo {
        ArtifactInfo {
            width: 1080,
            height: 1920,
            duration_ms: 37_000,
            fps: 30.0,
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            container: "mp4".to_string(),
            size_bytes: 42_000_000,
        }
    }

    #[tokio::test]
    async fn test_memory_store_transitions() {
        let store = MemoryMetadataStore::new();
        let id = RenderId::from_string("r-1");

        store
            .set_render_status(&id, RenderStatus::Rendering, None)
            .await
            .unwrap();
        store
            .set_artifact(&id, "renders/r-1.mp4".to_string(), artifact())
            .await
            .unwrap();
        store
            .set_render_status(&id, RenderStatus::Rendered, None)
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.render_status, RenderStatus::Rendered);
        assert_eq!(record.storage_key.as_deref(), Some("renders/r-1.mp4"));
        assert_eq!(record.publish_status, PublishStatus::Pending);
    }

    #[tokio::test]
    async fn test_memory_store_error_keeps_message() {
        let store = MemoryMetadataStore::new();
        let id = RenderId::from_string("r-2");

        store
            .set_render_status(&id, RenderStatus::Error, Some("engine exit 1".to_string()))
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.render_status, RenderStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("engine exit 1"));
    }

    #[tokio::test]
    async fn test_json_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileMetadataStore::new(dir.path());
        let id = RenderId::from_string("r-3");

        store
            .set_render_status(&id, RenderStatus::Rendering, None)
            .await
            .unwrap();
        store
            .set_publish_status(&id, PublishStatus::Uploading, None)
            .await
            .unwrap();
        store
            .set_platform_video_id(&id, "vid-9".to_string())
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.render_status, RenderStatus::Rendering);
        assert_eq!(record.publish_status, PublishStatus::Uploading);
        assert_eq!(record.platform_video_id.as_deref(), Some("vid-9"));

        assert!(store
            .get(&RenderId::from_string("missing"))
            .await
            .unwrap()
            .is_none());
    }
}
