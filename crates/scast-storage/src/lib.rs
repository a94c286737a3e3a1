//! R2 object storage client and multipart transport for rendered
//! artifacts.

pub mod client;
pub mod error;
pub mod multipart;

pub use client::{StorageClient, StorageConfig, UploadedPart};
pub use error::{StorageError, StorageResult};
pub use multipart::{upload_file_multipart, CompletedUpload, PartPlan};
