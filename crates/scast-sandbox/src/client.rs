//! HTTP client for the sandbox execution service.
//!
//! The service runs a program against a working directory of pre-fetched
//! files inside a resource-limited, time-boxed environment, and exposes a
//! ranged file-read operation for extracting output after completion.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SandboxError, SandboxResult};
use crate::session::SandboxGuard;

/// Configuration for the sandbox client.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Base URL of the sandbox service
    pub base_url: String,
    /// API token, sent as a bearer header when present
    pub api_token: Option<String>,
    /// Sandbox template image to boot
    pub template: String,
    /// Baseline timeout for control-plane calls
    pub request_timeout: Duration,
}

impl SandboxConfig {
    /// Create config from environment variables.
    pub fn from_env() -> SandboxResult<Self> {
        Ok(Self {
            base_url: std::env::var("SANDBOX_BASE_URL")
                .map_err(|_| SandboxError::config_error("SANDBOX_BASE_URL not set"))?,
            api_token: std::env::var("SANDBOX_API_TOKEN").ok(),
            template: std::env::var("SANDBOX_TEMPLATE").unwrap_or_else(|_| "render".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("SANDBOX_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

/// Result of executing a program in the sandbox.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecOutput {
    /// Process exit code
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr (the engine's diagnostic stream)
    pub stderr: String,
}

impl ExecOutput {
    /// Check if the execution succeeded.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    template: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    sandbox_id: String,
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    url: &'a str,
    dest: &'a str,
}

#[derive(Debug, Serialize)]
struct ExecRequest<'a> {
    program: &'a str,
    args: &'a [String],
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct StatResponse {
    size: u64,
}

#[derive(Debug, Deserialize)]
struct EncodedReadResponse {
    data: String,
}

/// Client for the sandbox service.
#[derive(Clone)]
pub struct SandboxClient {
    http: reqwest::Client,
    config: SandboxConfig,
}

impl SandboxClient {
    /// Create a new client from configuration.
    pub fn new(config: SandboxConfig) -> SandboxResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> SandboxResult<Self> {
        Self::new(SandboxConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> SandboxResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SandboxError::api(status.as_u16(), message))
    }

    /// Allocate a new sandbox session.
    ///
    /// This is a single attempt; the caller owns the retry budget.
    /// The returned guard tears the sandbox down when closed.
    pub async fn create_sandbox(&self) -> SandboxResult<SandboxGuard> {
        let response = self
            .request(self.http.post(self.url("/sandboxes")))
            .json(&CreateRequest {
                template: &self.config.template,
            })
            .send()
            .await
            .map_err(|e| SandboxError::create_failed(e.to_string()))?;

        let response = Self::check(response)
            .await
            .map_err(|e| SandboxError::create_failed(e.to_string()))?;

        let created: CreateResponse = response.json().await?;
        info!(sandbox_id = %created.sandbox_id, "Sandbox session created");

        Ok(SandboxGuard::new(self.clone(), created.sandbox_id))
    }

    /// Fetch a remote asset into the sandbox filesystem.
    pub(crate) async fn fetch_into(
        &self,
        sandbox_id: &str,
        url: &str,
        dest: &str,
    ) -> SandboxResult<()> {
        debug!(sandbox_id, url, dest, "Fetching asset into sandbox");

        let response = self
            .request(
                self.http
                    .post(self.url(&format!("/sandboxes/{sandbox_id}/fetch"))),
            )
            .json(&FetchRequest { url, dest })
            .send()
            .await
            .map_err(|e| SandboxError::FetchFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Self::check(response).await.map_err(|e| SandboxError::FetchFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Write a file into the sandbox working directory.
    pub(crate) async fn write_file(
        &self,
        sandbox_id: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> SandboxResult<()> {
        debug!(sandbox_id, path, size = bytes.len(), "Writing file into sandbox");

        let response = self
            .request(
                self.http
                    .put(self.url(&format!("/sandboxes/{sandbox_id}/files")))
                    .query(&[("path", path)]),
            )
            .body(bytes)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    /// Execute a program with a bounded timeout.
    ///
    /// A non-zero exit is reported in the returned [`ExecOutput`], not as
    /// an error; the caller decides how to classify it.
    pub(crate) async fn exec(
        &self,
        sandbox_id: &str,
        program: &str,
        args: &[String],
        timeout_secs: u64,
    ) -> SandboxResult<ExecOutput> {
        debug!(sandbox_id, program, timeout_secs, "Executing program in sandbox");

        let request = self
            .request(
                self.http
                    .post(self.url(&format!("/sandboxes/{sandbox_id}/exec"))),
            )
            .json(&ExecRequest {
                program,
                args,
                timeout_secs,
            })
            // The HTTP call must outlive the sandbox-side execution budget
            .timeout(Duration::from_secs(timeout_secs + 30));

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(SandboxError::Timeout(timeout_secs)),
            Err(e) => return Err(e.into()),
        };

        let output: ExecOutput = Self::check(response).await?.json().await?;
        Ok(output)
    }

    /// Size of a file in the sandbox filesystem.
    pub(crate) async fn stat_file(&self, sandbox_id: &str, path: &str) -> SandboxResult<u64> {
        let response = self
            .request(
                self.http
                    .get(self.url(&format!("/sandboxes/{sandbox_id}/files/stat")))
                    .query(&[("path", path)]),
            )
            .send()
            .await?;

        let stat: StatResponse = Self::check(response).await?.json().await?;
        Ok(stat.size)
    }

    /// Read a byte range of a sandbox file.
    ///
    /// `base64_encoded` selects the text-safe degraded path; callers must
    /// account for the ~33% inflation when sizing requests.
    pub(crate) async fn read_file_range(
        &self,
        sandbox_id: &str,
        path: &str,
        offset: u64,
        length: u64,
        base64_encoded: bool,
    ) -> SandboxResult<Vec<u8>> {
        let mut query = vec![
            ("path".to_string(), path.to_string()),
            ("offset".to_string(), offset.to_string()),
            ("length".to_string(), length.to_string()),
        ];
        if base64_encoded {
            query.push(("encoding".to_string(), "base64".to_string()));
        }

        let response = self
            .request(
                self.http
                    .get(self.url(&format!("/sandboxes/{sandbox_id}/files")))
                    .query(&query),
            )
            .send()
            .await?;

        let response = Self::check(response).await.map_err(|e| SandboxError::ReadFailed {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        if base64_encoded {
            use base64::Engine as _;
            let encoded: EncodedReadResponse = response.json().await?;
            Ok(base64::engine::general_purpose::STANDARD.decode(encoded.data)?)
        } else {
            Ok(response.bytes().await?.to_vec())
        }
    }

    /// Tear down a sandbox session.
    pub(crate) async fn delete_sandbox(&self, sandbox_id: &str) -> SandboxResult<()> {
        let response = self
            .request(
                self.http
                    .delete(self.url(&format!("/sandboxes/{sandbox_id}"))),
            )
            .send()
            .await?;

        Self::check(response).await?;
        info!(sandbox_id, "Sandbox session torn down");
        Ok(())
    }
}
