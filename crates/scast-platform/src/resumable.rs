//! Resumable upload client.
//!
//! Drives the platform's resumable protocol: create a session, submit
//! chunks sequentially with `Content-Range` headers, track the byte
//! offset from server acknowledgements, and finish on the completion
//! response carrying the durable video id. Chunks are never submitted
//! concurrently; that would invalidate monotonic offset tracking.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use scast_models::PublishMetadata;

use crate::error::{PlatformError, PlatformResult};
use crate::session::{SessionState, UploadSession};

/// Configuration for the platform client.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Endpoint creating upload sessions
    pub sessions_url: String,
    /// Base URL of the status-query API
    pub status_url: String,
    /// API token, sent as a bearer header when present
    pub api_token: Option<String>,
    /// Baseline timeout for control-plane calls
    pub request_timeout: Duration,
}

impl PlatformConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PlatformResult<Self> {
        Ok(Self {
            sessions_url: std::env::var("PLATFORM_SESSIONS_URL")
                .map_err(|_| PlatformError::config_error("PLATFORM_SESSIONS_URL not set"))?,
            status_url: std::env::var("PLATFORM_STATUS_URL")
                .map_err(|_| PlatformError::config_error("PLATFORM_STATUS_URL not set"))?,
            api_token: std::env::var("PLATFORM_API_TOKEN").ok(),
            request_timeout: Duration::from_secs(
                std::env::var("PLATFORM_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    #[serde(flatten)]
    metadata: &'a PublishMetadata,
    total_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    id: String,
}

/// Client for the video hosting platform.
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl PlatformClient {
    /// Create a new client from configuration.
    pub fn new(config: PlatformConfig) -> PlatformResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> PlatformResult<Self> {
        Self::new(PlatformConfig::from_env()?)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Create an upload session for `total_bytes` of video.
    ///
    /// The upload URL is taken from the `Location` header of the
    /// response, per the resumable contract.
    pub async fn create_session(
        &self,
        metadata: &PublishMetadata,
        total_bytes: u64,
    ) -> PlatformResult<UploadSession> {
        let response = self
            .request(self.http.post(&self.config.sessions_url))
            .header("X-Upload-Content-Length", total_bytes)
            .json(&CreateSessionRequest {
                metadata,
                total_bytes,
            })
            .send()
            .await
            .map_err(|e| PlatformError::SessionCreateFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::SessionCreateFailed(format!(
                "{status}: {message}"
            )));
        }

        let upload_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(PlatformError::MissingUploadUrl)?;

        info!(total_bytes, "Platform upload session created");
        Ok(UploadSession::new(upload_url, total_bytes))
    }

    /// Upload a file through an open session.
    ///
    /// Chunks are read at the acknowledged offset, so already-received
    /// bytes are never re-read. Returns the platform's durable video id
    /// on completion.
    pub async fn upload_file(
        &self,
        session: &mut UploadSession,
        path: impl AsRef<Path>,
        chunk_size: u64,
        chunk_timeout_secs: u64,
        cancel: Option<watch::Receiver<bool>>,
    ) -> PlatformResult<String> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path).await?;

        loop {
            if let Some(ref rx) = cancel {
                if *rx.borrow() {
                    session.fail();
                    return Err(PlatformError::Cancelled);
                }
            }

            let Some((offset, length)) = session.next_chunk(chunk_size)? else {
                break;
            };

            file.seek(std::io::SeekFrom::Start(offset)).await?;
            let mut buffer = vec![0u8; length as usize];
            file.read_exact(&mut buffer).await?;

            let last_byte = offset + length - 1;
            let content_range =
                format!("bytes {}-{}/{}", offset, last_byte, session.total_bytes);

            debug!(
                offset,
                length,
                total = session.total_bytes,
                "Submitting upload chunk"
            );

            let response = self
                .request(self.http.put(&session.upload_url))
                .header(reqwest::header::CONTENT_RANGE, &content_range)
                .timeout(Duration::from_secs(chunk_timeout_secs))
                .body(buffer)
                .send()
                .await?;

            match response.status().as_u16() {
                200 | 201 => {
                    let completed: CompleteResponse = response.json().await?;
                    session.complete(completed.id)?;
                }
                308 => {
                    let range = response
                        .headers()
                        .get(reqwest::header::RANGE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);

                    if range.is_none() {
                        // Degraded path: the server's receipt may differ
                        // from what was transmitted, but there is nothing
                        // better to go on.
                        warn!(
                            offset,
                            length,
                            "308 acknowledgement without Range header; assuming full chunk accepted"
                        );
                    }
                    session.advance(range.as_deref(), length)?;
                    debug!(
                        acknowledged = session.bytes_acknowledged,
                        total = session.total_bytes,
                        "Chunk acknowledged"
                    );
                }
                status => {
                    let message = response.text().await.unwrap_or_default();
                    session.fail();
                    return Err(PlatformError::protocol(status, message));
                }
            }
        }

        match &session.state {
            SessionState::Uploaded { video_id } => {
                info!(video_id = %video_id, "Platform upload complete");
                Ok(video_id.clone())
            }
            _ => Err(PlatformError::Incomplete {
                acknowledged: session.bytes_acknowledged,
                total: session.total_bytes,
            }),
        }
    }

    /// Query upload/processing status for a delivered video.
    pub async fn query_status(&self, video_id: &str) -> PlatformResult<crate::status::PlatformStatus> {
        let url = format!(
            "{}/{}",
            self.config.status_url.trim_end_matches('/'),
            video_id
        );

        let response = self.request(self.http.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::protocol(status.as_u16(), message));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scast_models::PrivacyDecision;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KIB: u64 = 1024;
    const CHUNK: u64 = 256 * KIB;

    fn metadata() -> PublishMetadata {
        PublishMetadata {
            title: "Daily digest".to_string(),
            description: "Automated slideshow".to_string(),
            tags: vec!["news".to_string()],
            privacy: PrivacyDecision::Unlisted,
        }
    }

    async fn client_for(server: &MockServer) -> PlatformClient {
        PlatformClient::new(PlatformConfig {
            sessions_url: format!("{}/sessions", server.uri()),
            status_url: format!("{}/videos", server.uri()),
            api_token: None,
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn write_payload(dir: &tempfile::TempDir, len: usize) -> std::path::PathBuf {
        let path = dir.path().join("video.mp4");
        tokio::fs::write(&path, vec![7u8; len]).await.unwrap();
        path
    }

    async fn mock_session_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", format!("{}/upload/abc", server.uri()).as_str()),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_two_chunk_upload_drives_offsets_from_server() {
        let server = MockServer::start().await;
        mock_session_create(&server).await;

        let total = CHUNK + 100;
        // First chunk acknowledged via Range header
        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .and(header("Content-Range", format!("bytes 0-{}/{}", CHUNK - 1, total).as_str()))
            .respond_with(
                ResponseTemplate::new(308)
                    .insert_header("Range", format!("bytes=0-{}", CHUNK - 1).as_str()),
            )
            .mount(&server)
            .await;
        // Final (undersized) chunk completes the session
        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .and(header(
                "Content-Range",
                format!("bytes {}-{}/{}", CHUNK, total - 1, total).as_str(),
            ))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "vid-777"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut session = client.create_session(&metadata(), total).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let payload = write_payload(&dir, total as usize).await;

        let video_id = client
            .upload_file(&mut session, &payload, CHUNK, 30, None)
            .await
            .unwrap();

        assert_eq!(video_id, "vid-777");
        assert!(session.is_complete());
        assert_eq!(session.degraded_acks, 0);
    }

    #[tokio::test]
    async fn test_missing_range_header_takes_degraded_path() {
        let server = MockServer::start().await;
        mock_session_create(&server).await;

        let total = CHUNK + 100;
        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .and(header("Content-Range", format!("bytes 0-{}/{}", CHUNK - 1, total).as_str()))
            .respond_with(ResponseTemplate::new(308))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .and(header(
                "Content-Range",
                format!("bytes {}-{}/{}", CHUNK, total - 1, total).as_str(),
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "vid-1"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut session = client.create_session(&metadata(), total).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let payload = write_payload(&dir, total as usize).await;

        client
            .upload_file(&mut session, &payload, CHUNK, 30, None)
            .await
            .unwrap();

        // The fallback advanced by exactly the submitted chunk length and
        // is visible on the session
        assert_eq!(session.degraded_acks, 1);
        assert!(session.is_complete());
    }

    #[tokio::test]
    async fn test_unexpected_status_fails_session() {
        let server = MockServer::start().await;
        mock_session_create(&server).await;

        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut session = client.create_session(&metadata(), CHUNK).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let payload = write_payload(&dir, CHUNK as usize).await;

        let err = client
            .upload_file(&mut session, &payload, CHUNK, 30, None)
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::Protocol { status: 500, .. }));
        assert_eq!(session.state, SessionState::Failed);
    }

    #[tokio::test]
    async fn test_session_create_requires_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.create_session(&metadata(), 100).await.unwrap_err();
        assert!(matches!(err, PlatformError::MissingUploadUrl));
    }
}
