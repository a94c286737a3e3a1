//! Resumable upload session state.
//!
//! `bytes_acknowledged` advances strictly monotonically, driven by the
//! server's range acknowledgements. The session is terminal once every
//! byte is acknowledged and the server has returned a completion
//! response.

use scast_models::pipeline::UPLOAD_CHUNK_GRANULARITY;

use crate::error::{PlatformError, PlatformResult};

/// State of a resumable upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Session created, no chunk submitted yet
    Created,
    /// At least one chunk acknowledged
    Uploading,
    /// Server returned the completion response
    Uploaded {
        /// Durable platform video identifier
        video_id: String,
    },
    /// Hard protocol failure; no automatic resume
    Failed,
}

/// A resumable upload session against the hosting platform.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Server-issued upload URL
    pub upload_url: String,
    /// Total payload size, bytes
    pub total_bytes: u64,
    /// Bytes the server has durably received
    pub bytes_acknowledged: u64,
    /// Times the offset was advanced without a server acknowledgement
    /// (degraded path; see [`UploadSession::advance`])
    pub degraded_acks: u32,
    /// Session state
    pub state: SessionState,
}

impl UploadSession {
    /// Create a fresh session for `total_bytes` of payload.
    pub fn new(upload_url: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            upload_url: upload_url.into(),
            total_bytes,
            bytes_acknowledged: 0,
            degraded_acks: 0,
            state: SessionState::Created,
        }
    }

    /// Whether every byte has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.bytes_acknowledged == self.total_bytes
    }

    /// The next chunk to submit, as `(offset, length)`.
    ///
    /// Non-final chunks are trimmed to a multiple of the 256 KiB
    /// granularity; servers reject or misprocess undersized intermediate
    /// chunks. Returns `None` once everything is acknowledged.
    pub fn next_chunk(&self, chunk_size: u64) -> PlatformResult<Option<(u64, u64)>> {
        let remaining = self.total_bytes - self.bytes_acknowledged;
        if remaining == 0 {
            return Ok(None);
        }

        let mut length = chunk_size.min(remaining);
        if length < remaining {
            // Not the final chunk: enforce the granularity law
            length = (length / UPLOAD_CHUNK_GRANULARITY) * UPLOAD_CHUNK_GRANULARITY;
            if length == 0 {
                return Err(PlatformError::internal(format!(
                    "chunk size {chunk_size} cannot satisfy the {UPLOAD_CHUNK_GRANULARITY}-byte granularity"
                )));
            }
        }

        Ok(Some((self.bytes_acknowledged, length)))
    }

    /// Advance the session after a "continue" response.
    ///
    /// The next offset must come from the server's acknowledgement; the
    /// server's receipt may differ from what was transmitted. When the
    /// header is absent the session assumes the full chunk was accepted,
    /// a degraded path that is counted and must be logged by the caller.
    pub fn advance(
        &mut self,
        range_header: Option<&str>,
        submitted_len: u64,
    ) -> PlatformResult<()> {
        let acknowledged = match range_header {
            Some(header) => parse_range_ack(header)?,
            None => {
                self.degraded_acks += 1;
                self.bytes_acknowledged + submitted_len
            }
        };

        if acknowledged < self.bytes_acknowledged {
            return Err(PlatformError::OffsetRegression {
                acknowledged,
                previous: self.bytes_acknowledged,
            });
        }
        if acknowledged > self.total_bytes {
            return Err(PlatformError::InvalidRangeHeader(format!(
                "acknowledged {acknowledged} beyond total {}",
                self.total_bytes
            )));
        }

        self.bytes_acknowledged = acknowledged;
        self.state = SessionState::Uploading;
        Ok(())
    }

    /// Mark the session uploaded after the completion response.
    pub fn complete(&mut self, video_id: String) -> PlatformResult<()> {
        // The completion response acknowledges the final chunk implicitly.
        self.bytes_acknowledged = self.total_bytes;
        self.state = SessionState::Uploaded { video_id };
        Ok(())
    }

    /// Mark the session failed; no resume is attempted by this layer.
    pub fn fail(&mut self) {
        self.state = SessionState::Failed;
    }
}

/// Parse a `Range: bytes=0-N` acknowledgement into the byte count the
/// server holds (`N + 1`).
pub fn parse_range_ack(header: &str) -> PlatformResult<u64> {
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| PlatformError::InvalidRangeHeader(header.to_string()))?;

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| PlatformError::InvalidRangeHeader(header.to_string()))?;

    if start.trim() != "0" {
        return Err(PlatformError::InvalidRangeHeader(header.to_string()));
    }

    let last: u64 = end
        .trim()
        .parse()
        .map_err(|_| PlatformError::InvalidRangeHeader(header.to_string()))?;

    Ok(last + 1)
}
