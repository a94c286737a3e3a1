//! Bounded artifact extraction.
//!
//! Reads a rendered file out of the sandbox in fixed-size ranged reads
//! and reassembles it on the host filesystem, so neither side ever holds
//! more than one chunk in memory. Direct binary transfer is preferred;
//! the base64 mode exists for transports that require a textual
//! representation, and its ~33% inflation is absorbed by shrinking the
//! requested range.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{SandboxError, SandboxResult};
use crate::session::SandboxGuard;

/// How file bytes travel out of the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Raw bytes on the wire
    #[default]
    Binary,
    /// Base64 text on the wire (degraded path)
    Base64,
}

impl ExtractMode {
    /// Range length to request so the on-wire payload stays within
    /// `read_size` after any encoding overhead.
    fn request_length(&self, read_size: usize) -> u64 {
        match self {
            ExtractMode::Binary => read_size as u64,
            // 4 output characters per 3 input bytes
            ExtractMode::Base64 => (read_size * 3 / 4).max(1) as u64,
        }
    }
}

/// Copy a sandbox file to the host in bounded reads.
///
/// Returns the number of bytes written. The file size is taken from a
/// stat call up front; a short or over-long range response is treated as
/// corruption and fails the extraction.
pub async fn extract_file(
    sandbox: &SandboxGuard,
    remote_path: &str,
    local_path: &Path,
    read_size: usize,
    mode: ExtractMode,
) -> SandboxResult<u64> {
    let total = sandbox.stat_file(remote_path).await?;
    let request_length = mode.request_length(read_size);

    debug!(
        sandbox_id = %sandbox.id(),
        remote_path,
        total,
        request_length,
        ?mode,
        "Extracting artifact from sandbox"
    );

    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(local_path).await?;

    let mut offset = 0u64;
    while offset < total {
        let length = request_length.min(total - offset);
        let chunk = sandbox
            .read_file_range(remote_path, offset, length, mode == ExtractMode::Base64)
            .await?;

        if chunk.len() as u64 != length {
            return Err(SandboxError::ReadFailed {
                path: remote_path.to_string(),
                message: format!(
                    "range [{offset}, {offset}+{length}) returned {} bytes",
                    chunk.len()
                ),
            });
        }

        file.write_all(&chunk).await?;
        offset += length;
    }

    file.flush().await?;

    info!(
        sandbox_id = %sandbox.id(),
        remote_path,
        local_path = %local_path.display(),
        bytes = total,
        "Artifact extracted"
    );

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SandboxClient, SandboxConfig};
    use base64::Engine as _;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SandboxClient {
        SandboxClient::new(SandboxConfig {
            base_url: server.uri(),
            api_token: None,
            template: "render".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn mock_session(server: &MockServer) {
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
            .mount(server)
            .await;
    }

    fn mock_stat(size: u64) -> Mock {
        Mock::given(method("GET"))
            .and(path("/v1/sandboxes/sbx-1/files/stat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"size": size})))
    }

    fn mock_range(offset: u64, body: &[u8]) -> Mock {
        Mock::given(method("GET"))
            .and(path("/v1/sandboxes/sbx-1/files"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
    }

    #[tokio::test]
    async fn test_binary_extraction_reassembles_in_bounded_reads() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        let payload = b"0123456789";
        mock_stat(10).mount(&server).await;
        mock_range(0, &payload[0..4]).mount(&server).await;
        mock_range(4, &payload[4..8]).mount(&server).await;
        mock_range(8, &payload[8..10]).mount(&server).await;

        let client = client_for(&server).await;
        let mut sandbox = client.create_sandbox().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.mp4");
        let bytes = extract_file(&sandbox, "out.mp4", &local, 4, ExtractMode::Binary)
            .await
            .unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(tokio::fs::read(&local).await.unwrap(), payload);
        sandbox.close().await;
    }

    #[tokio::test]
    async fn test_base64_extraction_shrinks_requested_range() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        let payload = b"abcdefgh";
        mock_stat(8).mount(&server).await;
        // read_size 4 -> 3-byte ranges on the wire
        for (offset, chunk) in [(0u64, &payload[0..3]), (3, &payload[3..6]), (6, &payload[6..8])] {
            let encoded = base64::engine::general_purpose::STANDARD.encode(chunk);
            Mock::given(method("GET"))
                .and(path("/v1/sandboxes/sbx-1/files"))
                .and(query_param("offset", offset.to_string()))
                .and(query_param("encoding", "base64"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": encoded})),
                )
                .mount(&server)
                .await;
        }

        let client = client_for(&server).await;
        let mut sandbox = client.create_sandbox().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.mp4");
        let bytes = extract_file(&sandbox, "out.mp4", &local, 4, ExtractMode::Base64)
            .await
            .unwrap();

        assert_eq!(bytes, 8);
        assert_eq!(tokio::fs::read(&local).await.unwrap(), payload);
        sandbox.close().await;
    }

    #[tokio::test]
    async fn test_short_range_response_fails_extraction() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        mock_stat(10).mount(&server).await;
        // Server returns fewer bytes than the requested range
        mock_range(0, b"01").mount(&server).await;

        let client = client_for(&server).await;
        let mut sandbox = client.create_sandbox().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("out.mp4");
        let err = extract_file(&sandbox, "out.mp4", &local, 4, ExtractMode::Binary)
            .await
            .unwrap_err();

        assert!(matches!(err, SandboxError::ReadFailed { .. }));
        sandbox.close().await;
    }

    #[tokio::test]
    async fn test_closed_guard_refuses_operations() {
        let server = MockServer::start().await;
        mock_session(&server).await;

        let client = client_for(&server).await;
        let mut sandbox = client.create_sandbox().await.unwrap();
        sandbox.close().await;

        let err = sandbox.stat_file("out.mp4").await.unwrap_err();
        assert!(matches!(err, SandboxError::SessionClosed));
    }
}
