//! Scoped sandbox session guard.
//!
//! Sandbox compute is billable; a session left running after a failed
//! render leaks money. The guard owns the session id and must be closed
//! on every exit path, including cancellation. Teardown failures are
//! logged, never propagated over the original error.

use tracing::warn;

use crate::client::{ExecOutput, SandboxClient};
use crate::error::{SandboxError, SandboxResult};

/// An allocated sandbox session that tears itself down on `close`.
pub struct SandboxGuard {
    client: SandboxClient,
    sandbox_id: String,
    closed: bool,
}

impl SandboxGuard {
    pub(crate) fn new(client: SandboxClient, sandbox_id: String) -> Self {
        Self {
            client,
            sandbox_id,
            closed: false,
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.sandbox_id
    }

    fn ensure_open(&self) -> SandboxResult<()> {
        if self.closed {
            return Err(SandboxError::SessionClosed);
        }
        Ok(())
    }

    /// Fetch a remote asset into the sandbox filesystem.
    pub async fn fetch_into(&self, url: &str, dest: &str) -> SandboxResult<()> {
        self.ensure_open()?;
        self.client.fetch_into(&self.sandbox_id, url, dest).await
    }

    /// Write a file into the sandbox working directory.
    pub async fn write_file(&self, path: &str, bytes: Vec<u8>) -> SandboxResult<()> {
        self.ensure_open()?;
        self.client.write_file(&self.sandbox_id, path, bytes).await
    }

    /// Execute a program with a bounded timeout.
    pub async fn exec(
        &self,
        program: &str,
        args: &[String],
        timeout_secs: u64,
    ) -> SandboxResult<ExecOutput> {
        self.ensure_open()?;
        self.client
            .exec(&self.sandbox_id, program, args, timeout_secs)
            .await
    }

    /// Size of a file in the sandbox filesystem.
    pub async fn stat_file(&self, path: &str) -> SandboxResult<u64> {
        self.ensure_open()?;
        self.client.stat_file(&self.sandbox_id, path).await
    }

    /// Read a byte range of a sandbox file.
    pub async fn read_file_range(
        &self,
        path: &str,
        offset: u64,
        length: u64,
        base64_encoded: bool,
    ) -> SandboxResult<Vec<u8>> {
        self.ensure_open()?;
        self.client
            .read_file_range(&self.sandbox_id, path, offset, length, base64_encoded)
            .await
    }

    /// Tear the sandbox down (best effort).
    ///
    /// Idempotent: closing an already-closed guard is a no-op. A teardown
    /// failure is logged and swallowed so it cannot mask whatever error
    /// the caller is already propagating.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.client.delete_sandbox(&self.sandbox_id).await {
            warn!(
                sandbox_id = %self.sandbox_id,
                error = %e,
                "Failed to tear down sandbox; the service-side timeout will reap it"
            );
        }
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if !self.closed {
            // Async teardown is impossible here; the service-side wall
            // clock will reap the session, but this is still a bug in the
            // caller worth surfacing.
            warn!(
                sandbox_id = %self.sandbox_id,
                "SandboxGuard dropped without close() - sandbox left to expire"
            );
        }
    }
}
