//! Resumable upload client for the video hosting platform.
//!
//! Implements the session-based resumable protocol: metadata POST to
//! obtain an upload URL, sequential 256 KiB-granular chunk submission
//! with server-acknowledged offset tracking, completion with the durable
//! video id, and status polling until the platform finishes processing.

pub mod error;
pub mod resumable;
pub mod session;
pub mod status;

pub use error::{PlatformError, PlatformResult};
pub use resumable::{PlatformClient, PlatformConfig};
pub use session::{parse_range_ack, SessionState, UploadSession};
pub use status::{poll_until_terminal, PlatformStatus};
