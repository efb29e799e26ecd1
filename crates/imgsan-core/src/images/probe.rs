//! Dimension probing.

use tracing::debug;

use super::ImageMetadata;
use super::backend::ImageBackend;

/// Reads the pixel dimensions of `bytes` with `backend`.
///
/// Any failure yields `None`; callers treat that as "size unknown" and leave
/// the image alone instead of dropping it.
pub async fn probe_metadata<B: ImageBackend>(backend: &B, bytes: &[u8]) -> Option<ImageMetadata> {
    match backend.metadata(bytes).await {
        Ok(meta) => meta,
        Err(e) => {
            debug!(backend = %backend.kind(), error = %e, "image metadata probe failed");
            None
        }
    }
}
