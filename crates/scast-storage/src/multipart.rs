//! Chunked multipart upload transport.
//!
//! Splits a large artifact into fixed-size parts and drives the
//! multipart-upload protocol against the object store. At most one
//! part's bytes are held in memory at a time; part numbers increase
//! strictly; any part failure aborts the whole session, because a gap in
//! part numbers invalidates the entire upload.

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::{StorageClient, UploadedPart};
use crate::error::{StorageError, StorageResult};

/// Pure part arithmetic for a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    /// Total bytes to upload
    pub total_bytes: u64,
    /// Fixed part size (only the final part may be smaller)
    pub part_size: u64,
}

impl PartPlan {
    pub fn new(total_bytes: u64, part_size: u64) -> Self {
        Self {
            total_bytes,
            part_size,
        }
    }

    /// Number of parts: `ceil(total / part_size)`.
    pub fn part_count(&self) -> u64 {
        self.total_bytes.div_ceil(self.part_size)
    }

    /// Byte span of the 1-based part `n`, as `(offset, length)`.
    pub fn span(&self, n: u64) -> Option<(u64, u64)> {
        if n == 0 || n > self.part_count() {
            return None;
        }
        let offset = (n - 1) * self.part_size;
        let length = self.part_size.min(self.total_bytes - offset);
        Some((offset, length))
    }
}

/// Result of a completed multipart upload.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    /// Object key
    pub key: String,
    /// Final checksum returned by the store
    pub etag: String,
    /// Bytes uploaded
    pub total_bytes: u64,
    /// Number of parts submitted
    pub part_count: u64,
}

/// Upload a file through the multipart protocol.
///
/// Parts are submitted strictly sequentially with increasing part
/// numbers; the buffer is reused so memory stays bounded by one part.
/// On any failure (including cancellation) the session is aborted rather
/// than left half-open.
pub async fn upload_file_multipart(
    client: &StorageClient,
    path: impl AsRef<Path>,
    key: &str,
    content_type: &str,
    part_size: u64,
    cancel: Option<watch::Receiver<bool>>,
) -> StorageResult<CompletedUpload> {
    let path = path.as_ref();
    let total_bytes = tokio::fs::metadata(path).await?.len();

    if total_bytes == 0 {
        return Err(StorageError::upload_failed("refusing to upload empty artifact"));
    }

    let plan = PartPlan::new(total_bytes, part_size);
    let upload_id = client.create_multipart(key, content_type).await?;

    info!(
        key,
        total_bytes,
        part_count = plan.part_count(),
        part_size,
        "Starting multipart upload"
    );

    match upload_parts(client, path, key, &upload_id, &plan, cancel).await {
        Ok(parts) => {
            let etag = client.complete_multipart(key, &upload_id, &parts).await?;
            info!(key, etag = %etag, "Multipart upload completed");
            Ok(CompletedUpload {
                key: key.to_string(),
                etag,
                total_bytes,
                part_count: plan.part_count(),
            })
        }
        Err(e) => {
            // A gap in part numbers invalidates the whole upload; abort
            // instead of leaving a zombie session holding storage.
            if let Err(abort_err) = client.abort_multipart(key, &upload_id).await {
                warn!(
                    key,
                    upload_id = %upload_id,
                    error = %abort_err,
                    "Failed to abort multipart session after upload error"
                );
            }
            Err(e)
        }
    }
}

async fn upload_parts(
    client: &StorageClient,
    path: &Path,
    key: &str,
    upload_id: &str,
    plan: &PartPlan,
    cancel: Option<watch::Receiver<bool>>,
) -> StorageResult<Vec<UploadedPart>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut parts = Vec::with_capacity(plan.part_count() as usize);

    for n in 1..=plan.part_count() {
        if let Some(ref rx) = cancel {
            if *rx.borrow() {
                return Err(StorageError::Cancelled);
            }
        }

        let (offset, length) = plan
            .span(n)
            .expect("part number within computed plan");

        file.seek(std::io::SeekFrom::Start(offset)).await?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer).await?;

        let part = client
            .upload_part(key, upload_id, n as i32, buffer)
            .await?;
        tracing::debug!(key, part_number = part.part_number, length, "Part uploaded");
        parts.push(part);
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_part_count_is_ceiling() {
        assert_eq!(PartPlan::new(45 * MB, 15 * MB).part_count(), 3);
        assert_eq!(PartPlan::new(40 * MB, 15 * MB).part_count(), 3);
        assert_eq!(PartPlan::new(15 * MB, 15 * MB).part_count(), 1);
        assert_eq!(PartPlan::new(15 * MB + 1, 15 * MB).part_count(), 2);
        assert_eq!(PartPlan::new(1, 15 * MB).part_count(), 1);
    }

    #[test]
    fn test_spans_are_contiguous_and_gapless() {
        let plan = PartPlan::new(40 * MB, 15 * MB);
        let spans: Vec<_> = (1..=plan.part_count()).map(|n| plan.span(n).unwrap()).collect();

        assert_eq!(spans[0], (0, 15 * MB));
        assert_eq!(spans[1], (15 * MB, 15 * MB));
        // Final part carries the remainder; no part is oversized
        assert_eq!(spans[2], (30 * MB, 10 * MB));

        let covered: u64 = spans.iter().map(|(_, len)| len).sum();
        assert_eq!(covered, 40 * MB);
        for window in spans.windows(2) {
            assert_eq!(window[0].0 + window[0].1, window[1].0);
        }
    }

    #[test]
    fn test_only_final_part_may_be_short() {
        let plan = PartPlan::new(32 * MB, 15 * MB);
        let count = plan.part_count();
        for n in 1..count {
            assert_eq!(plan.span(n).unwrap().1, 15 * MB);
        }
        assert_eq!(plan.span(count).unwrap().1, 2 * MB);
    }

    #[test]
    fn test_span_bounds() {
        let plan = PartPlan::new(10 * MB, 15 * MB);
        assert_eq!(plan.span(0), None);
        assert_eq!(plan.span(2), None);
        assert_eq!(plan.span(1), Some((0, 10 * MB)));
    }

    #[test]
    fn test_exact_multiple_has_no_short_part() {
        let plan = PartPlan::new(45 * MB, 15 * MB);
        for n in 1..=3 {
            assert_eq!(plan.span(n).unwrap().1, 15 * MB);
        }
    }
}
