//! Downscale-to-fit with backend fallback.

use tracing::{debug, warn};

use super::backend::{BackendKind, ImageBackend};
use super::mime::{is_image_mime, sniff_mime};
use crate::error::ImageError;

/// Parameters for a single resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    /// Bounding box side; output fits in `max_side x max_side`.
    pub max_side: u32,
    /// Encoder quality, 1-100. Ignored by lossless encoders.
    pub quality: u8,
    /// Never upscale an image that already fits.
    pub without_enlargement: bool,
}

impl ResizeRequest {
    pub fn new(max_side: u32, quality: u8) -> Self {
        Self {
            max_side: max_side.max(1),
            quality: quality.clamp(1, 100),
            without_enlargement: true,
        }
    }

    #[must_use]
    pub fn allow_enlargement(mut self) -> Self {
        self.without_enlargement = false;
        self
    }
}

/// Encoded output of a resize, labelled with its sniffed MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Computes output dimensions that fit in a `max_side` square, keeping the
/// aspect ratio. Each side is at least 1.
pub fn fit_within(width: u32, height: u32, max_side: u32, without_enlargement: bool) -> (u32, u32) {
    let max_side = max_side.max(1);
    let (width, height) = (width.max(1), height.max(1));

    if without_enlargement && width <= max_side && height <= max_side {
        return (width, height);
    }

    let scale = f64::from(max_side) / f64::from(width.max(height));
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_side);
    (scaled(width), scaled(height))
}

/// Resizes `bytes` with the selected backend.
///
/// When the native backend is selected and fails (missing codec, unsupported
/// format, ...), the external tool is tried before giving up. The returned
/// MIME type comes from sniffing the output, since the encoder may have
/// changed the format. Output that does not sniff as an image is an error.
pub async fn resize_image<N, E>(
    native: &N,
    external: &E,
    kind: BackendKind,
    bytes: &[u8],
    mime_type: &str,
    request: &ResizeRequest,
) -> Result<ResizedImage, ImageError>
where
    N: ImageBackend,
    E: ImageBackend,
{
    let output = match kind {
        BackendKind::Native => match native.resize(bytes, mime_type, request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "native resize failed, falling back to external tool");
                external.resize(bytes, mime_type, request).await?
            }
        },
        BackendKind::ExternalTool => external.resize(bytes, mime_type, request).await?,
    };

    let sniffed = match sniff_mime(&output) {
        Some(sniffed) if is_image_mime(sniffed) => sniffed,
        other => {
            return Err(ImageError::UnrecognizedOutput {
                detected: other.unwrap_or("unknown").to_string(),
            });
        }
    };
    debug!(
        input_bytes = bytes.len(),
        output_bytes = output.len(),
        mime_type = sniffed,
        max_side = request.max_side,
        "resized image"
    );

    Ok(ResizedImage {
        mime_type: sniffed.to_string(),
        bytes: output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::test_support::{FailingBackend, StubBackend, jpeg_bytes, png_bytes};

    #[test]
    fn test_fit_within_landscape() {
        assert_eq!(fit_within(4000, 2000, 2000, true), (2000, 1000));
    }

    #[test]
    fn test_fit_within_portrait_rounds() {
        assert_eq!(fit_within(1000, 3001, 2000, true), (666, 2000));
    }

    #[test]
    fn test_fit_within_keeps_small_images() {
        assert_eq!(fit_within(640, 480, 2000, true), (640, 480));
    }

    #[test]
    fn test_fit_within_enlarges_when_allowed() {
        assert_eq!(fit_within(640, 480, 1280, false), (1280, 960));
    }

    #[test]
    fn test_fit_within_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 1, 100, true), (100, 1));
    }

    #[test]
    fn test_request_clamps_quality() {
        assert_eq!(ResizeRequest::new(100, 0).quality, 1);
        assert_eq!(ResizeRequest::new(100, 200).quality, 100);
        assert!(ResizeRequest::new(100, 80).without_enlargement);
        assert!(!ResizeRequest::new(100, 80).allow_enlargement().without_enlargement);
    }

    #[tokio::test]
    async fn test_native_failure_falls_back_to_external() {
        let external = StubBackend::new(BackendKind::ExternalTool, jpeg_bytes(200, 100));
        let request = ResizeRequest::new(200, 80);

        let resized = resize_image(
            &FailingBackend::native(),
            &external,
            BackendKind::Native,
            &png_bytes(400, 200),
            "image/png",
            &request,
        )
        .await
        .unwrap();

        assert_eq!(resized.mime_type, "image/jpeg");
        assert_eq!(external.resize_calls(), 1);
    }

    #[tokio::test]
    async fn test_external_selection_skips_native() {
        let native = StubBackend::new(BackendKind::Native, png_bytes(10, 10));
        let external = StubBackend::new(BackendKind::ExternalTool, jpeg_bytes(10, 10));

        let resized = resize_image(
            &native,
            &external,
            BackendKind::ExternalTool,
            &png_bytes(20, 20),
            "image/png",
            &ResizeRequest::new(10, 80),
        )
        .await
        .unwrap();

        assert_eq!(resized.mime_type, "image/jpeg");
        assert_eq!(native.resize_calls(), 0);
        assert_eq!(external.resize_calls(), 1);
    }

    #[tokio::test]
    async fn test_external_failure_is_reported() {
        let result = resize_image(
            &FailingBackend::native(),
            &FailingBackend::external(),
            BackendKind::Native,
            &png_bytes(20, 20),
            "image/png",
            &ResizeRequest::new(10, 80),
        )
        .await;

        assert!(matches!(result, Err(ImageError::ToolFailed { .. })));
    }

    #[tokio::test]
    async fn test_unrecognized_output_is_an_error() {
        let external = StubBackend::new(BackendKind::ExternalTool, b"not an image at all".to_vec());

        let err = resize_image(
            &FailingBackend::native(),
            &external,
            BackendKind::Native,
            &png_bytes(20, 20),
            "image/png",
            &ResizeRequest::new(10, 80),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ImageError::UnrecognizedOutput { ref detected } if detected == "unknown"
        ));
    }

    #[tokio::test]
    async fn test_non_image_output_is_an_error() {
        let external = StubBackend::new(
            BackendKind::ExternalTool,
            b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj\n".to_vec(),
        );

        let err = resize_image(
            &FailingBackend::native(),
            &external,
            BackendKind::Native,
            &png_bytes(20, 20),
            "image/png",
            &ResizeRequest::new(10, 80),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "resized output is not a recognized image (detected: application/pdf)"
        );
    }
}
