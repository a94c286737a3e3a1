//! Client for the disposable render sandbox service.
//!
//! The sandbox runs the external render engine inside a CPU/RAM/disk
//! bounded environment with network access only for declared asset
//! fetches. This crate covers the session lifecycle (creation, guarded
//! teardown), asset staging, bounded execution and chunked artifact
//! extraction.

pub mod client;
pub mod error;
pub mod extract;
pub mod session;

pub use client::{ExecOutput, SandboxClient, SandboxConfig};
pub use error::{SandboxError, SandboxResult};
pub use extract::{extract_file, ExtractMode};
pub use session::SandboxGuard;
