//! Slidecast render pipeline worker.
//!
//! Orchestrates one render request end to end: validation, timeline and
//! composition planning, sandboxed render execution, bounded artifact
//! extraction, multipart persistence to object storage, and resumable
//! delivery to the hosting platform.

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job::RenderJob;
pub use logging::RenderLogger;
pub use metadata::{JsonFileMetadataStore, MemoryMetadataStore, MetadataStore, RenderRecord};
pub use pipeline::{PipelineOutcome, RenderPipeline};
pub use publish::PublishOutcome;
pub use render::RenderOutput;
pub use retry::{retry_async, RetryConfig};
