//! Image sanitization for tool results.
//!
//! Every image block leaving this module either carries its sniffed MIME type
//! and fits the dimension limit, or has been replaced by a text block saying
//! why it was dropped. Failures stay local to their block.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use imgsan_types::{ContentBlock, ToolResult};
use tracing::{debug, warn};

use crate::config::ImagesConfig;
use crate::error::ImageError;
use crate::images::ImageProcessor;
use crate::images::backend::ImageBackend;
use crate::images::mime::{BASE64_LENIENT, sniff_mime_base64};
use crate::images::resize::ResizedImage;

/// Label used for images attached directly by the user.
pub const PROMPT_IMAGES_LABEL: &str = "prompt:images";

/// Side lengths tried when a resize overshoots `max_bytes`, as percentages of
/// the dimension limit.
const SIDE_STEPS_PERCENT: [u32; 3] = [100, 75, 50];

/// Fallback JPEG qualities tried after the configured one.
const QUALITY_STEPS: [u8; 2] = [70, 50];

/// Limits applied by the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Largest allowed width or height.
    pub max_dimension_px: u32,
    /// Largest allowed size of a resized image, in decoded bytes.
    pub max_bytes: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            max_dimension_px: ImagesConfig::DEFAULT_MAX_DIMENSION_PX,
            max_bytes: ImagesConfig::DEFAULT_MAX_BYTES,
        }
    }
}

impl SanitizeOptions {
    pub fn from_config(config: &ImagesConfig) -> Self {
        Self {
            max_dimension_px: config.max_dimension_px.max(1),
            max_bytes: config.max_bytes,
        }
    }

    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension_px: u32) -> Self {
        self.max_dimension_px = max_dimension_px.max(1);
        self
    }
}

/// Sanitizes the image blocks of a tool result.
///
/// Results without any image or text block are returned as-is (borrowed).
/// Otherwise a new result is built; the input is never modified.
pub async fn sanitize_tool_result<'a, N, E>(
    processor: &ImageProcessor<N, E>,
    result: &'a ToolResult,
    label: &str,
    opts: &SanitizeOptions,
) -> Cow<'a, ToolResult>
where
    N: ImageBackend,
    E: ImageBackend,
{
    if !result.has_media_or_text() {
        return Cow::Borrowed(result);
    }
    let content = sanitize_content_blocks(processor, &result.content, label, opts).await;
    Cow::Owned(result.with_content(content))
}

/// Sanitizes user-attached images.
pub async fn sanitize_image_blocks<N, E>(
    processor: &ImageProcessor<N, E>,
    blocks: &[ContentBlock],
    opts: &SanitizeOptions,
) -> Vec<ContentBlock>
where
    N: ImageBackend,
    E: ImageBackend,
{
    sanitize_content_blocks(processor, blocks, PROMPT_IMAGES_LABEL, opts).await
}

/// Sanitizes a block sequence, keeping order and count.
///
/// Blocks are processed one at a time so the external tool never runs more
/// than one subprocess per sequence.
pub async fn sanitize_content_blocks<N, E>(
    processor: &ImageProcessor<N, E>,
    blocks: &[ContentBlock],
    label: &str,
    opts: &SanitizeOptions,
) -> Vec<ContentBlock>
where
    N: ImageBackend,
    E: ImageBackend,
{
    let mut out = Vec::with_capacity(blocks.len());

    for block in blocks {
        let ContentBlock::Image { data, mime_type } = block else {
            out.push(block.clone());
            continue;
        };

        if data.trim().is_empty() {
            out.push(ContentBlock::text(format!(
                "[{label}] omitted empty image payload"
            )));
            continue;
        }

        match sanitize_image(processor, data, mime_type, opts).await {
            Ok(block) => out.push(block),
            Err(e) => {
                warn!(label, error = %e, "omitting image payload");
                out.push(ContentBlock::text(format!(
                    "[{label}] omitted image payload: {e}"
                )));
            }
        }
    }

    out
}

async fn sanitize_image<N, E>(
    processor: &ImageProcessor<N, E>,
    data: &str,
    declared_mime: &str,
    opts: &SanitizeOptions,
) -> Result<ContentBlock, ImageError>
where
    N: ImageBackend,
    E: ImageBackend,
{
    let mime_type = sniff_mime_base64(data).unwrap_or(declared_mime);
    let bytes = decode_base64(data)?;

    if let Some(meta) = processor.probe(&bytes).await
        && meta.fits_within(opts.max_dimension_px)
    {
        return Ok(ContentBlock::image(data, mime_type));
    }

    let resized = downscale_to_limits(processor, &bytes, mime_type, opts).await?;
    Ok(ContentBlock::image(
        BASE64.encode(&resized.bytes),
        resized.mime_type,
    ))
}

fn decode_base64(data: &str) -> Result<Vec<u8>, ImageError> {
    let compact: Cow<'_, str> = if data.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(data.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(data)
    };
    Ok(BASE64_LENIENT.decode(compact.as_bytes())?)
}

/// Resizes to the dimension limit, shrinking further or lowering JPEG quality
/// until the output fits `max_bytes`.
async fn downscale_to_limits<N, E>(
    processor: &ImageProcessor<N, E>,
    bytes: &[u8],
    mime_type: &str,
    opts: &SanitizeOptions,
) -> Result<ResizedImage, ImageError>
where
    N: ImageBackend,
    E: ImageBackend,
{
    let base_quality = processor.quality();
    let qualities: Vec<u8> = std::iter::once(base_quality)
        .chain(QUALITY_STEPS.into_iter().filter(|&q| q < base_quality))
        .collect();

    let mut smallest = usize::MAX;
    for percent in SIDE_STEPS_PERCENT {
        let side = (opts.max_dimension_px.saturating_mul(percent) / 100).max(1);
        for &quality in &qualities {
            let resized = processor.resize(bytes, mime_type, side, quality).await?;
            if resized.bytes.len() <= opts.max_bytes {
                debug!(side, quality, bytes = resized.bytes.len(), "image fits limits");
                return Ok(resized);
            }
            smallest = smallest.min(resized.bytes.len());
            // Quality only matters for lossy output.
            if resized.mime_type != "image/jpeg" {
                break;
            }
        }
    }

    Err(ImageError::TooLarge {
        bytes: smallest,
        max_bytes: opts.max_bytes,
    })
}
