//! Backend bundle used by the sanitizer.

use tracing::debug;

use super::ImageMetadata;
use super::backend::{
    BackendKind, ExternalToolBackend, ImageBackend, NativeBackend, RuntimeEnv, select_backend,
};
use super::probe::probe_metadata;
use super::resize::{ResizeRequest, ResizedImage, resize_image};
use crate::config::ImagesConfig;
use crate::error::ImageError;

/// Both backends plus the one selected for this process.
///
/// The native backend stays reachable even when the external tool is
/// selected so tests can force either path; resizes selected as native fall
/// back to the external tool on failure.
#[derive(Debug, Clone)]
pub struct ImageProcessor<N = NativeBackend, E = ExternalToolBackend> {
    native: N,
    external: E,
    kind: BackendKind,
    quality: u8,
}

impl ImageProcessor {
    /// Builds the production processor from configuration.
    pub fn from_config(config: &ImagesConfig, runtime: &RuntimeEnv) -> Self {
        let kind = select_backend(config.backend, runtime);
        debug!(
            backend = %kind,
            native_available = runtime.native_available,
            os = %runtime.os,
            "selected image backend"
        );
        Self {
            native: NativeBackend::new(),
            external: ExternalToolBackend::new(config.external_tool.clone()),
            kind,
            quality: config.jpeg_quality,
        }
    }
}

impl<N: ImageBackend, E: ImageBackend> ImageProcessor<N, E> {
    /// Builds a processor from explicit backends.
    pub fn with_backends(native: N, external: E, kind: BackendKind) -> Self {
        Self {
            native,
            external,
            kind,
            quality: ImagesConfig::DEFAULT_JPEG_QUALITY,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Reads dimensions with the selected backend. `None` on any failure.
    pub async fn probe(&self, bytes: &[u8]) -> Option<ImageMetadata> {
        match self.kind {
            BackendKind::Native => probe_metadata(&self.native, bytes).await,
            BackendKind::ExternalTool => probe_metadata(&self.external, bytes).await,
        }
    }

    /// Downscales `bytes` to fit `max_side` at `quality`.
    pub async fn resize(
        &self,
        bytes: &[u8],
        mime_type: &str,
        max_side: u32,
        quality: u8,
    ) -> Result<ResizedImage, ImageError> {
        let request = ResizeRequest::new(max_side, quality);
        self.resize_with(bytes, mime_type, &request).await
    }

    pub async fn resize_with(
        &self,
        bytes: &[u8],
        mime_type: &str,
        request: &ResizeRequest,
    ) -> Result<ResizedImage, ImageError> {
        resize_image(
            &self.native,
            &self.external,
            self.kind,
            bytes,
            mime_type,
            request,
        )
        .await
    }
}
