//! Shared data models for the Slidecast render pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Slide and narration assets
//! - Render requests and derived timeline slots
//! - Artifact metadata produced by a render
//! - Render and publish status transitions
//! - Encoding and pipeline configuration

pub mod artifact;
pub mod asset;
pub mod encoding;
pub mod job;
pub mod pipeline;
pub mod publish;
pub mod request;
pub mod status;
pub mod timeline;

// Re-export common types
pub use artifact::ArtifactInfo;
pub use asset::{AudioAsset, SlideAsset};
pub use encoding::EncodingConfig;
pub use job::RenderId;
pub use pipeline::{PipelineConfig, RenderEngine};
pub use publish::{PrivacyDecision, PublishMetadata};
pub use request::{Orientation, RenderRequest};
pub use status::{PublishStatus, RenderStatus};
pub use timeline::{TimelineSlot, ZoomDirection};
