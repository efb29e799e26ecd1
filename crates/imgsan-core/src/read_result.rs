//! MIME repair for results of the read-file tool.
//!
//! The read tool labels images by file extension. This module checks the
//! label against the bytes and rewrites it (plus the `Read image file [..]`
//! header) when they disagree.

use std::sync::LazyLock;

use imgsan_types::{ContentBlock, ToolResult};
use regex::Regex;
use tracing::debug;

use crate::error::ReadImageError;
use crate::images::mime::{is_image_mime, sniff_mime_base64};

static READ_IMAGE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Read image file \[([^\]]+)\]\s*$").expect("valid regex"));

/// Header text the read tool emits before an image block.
pub fn read_image_header(mime_type: &str) -> String {
    format!("Read image file [{mime_type}]")
}

/// Fixes the MIME label of a read-tool image result.
///
/// # Errors
/// - the image payload is empty
/// - the bytes classify as something other than an image
pub fn normalize_read_result(
    result: ToolResult,
    file_path: &str,
) -> Result<ToolResult, ReadImageError> {
    let Some((data, declared)) = result.content.iter().find_map(|block| match block {
        ContentBlock::Image { data, mime_type } => Some((data.as_str(), mime_type.as_str())),
        _ => None,
    }) else {
        return Ok(result);
    };

    if data.trim().is_empty() {
        return Err(ReadImageError::EmptyPayload {
            path: file_path.to_string(),
        });
    }

    let Some(sniffed) = sniff_mime_base64(data) else {
        return Ok(result);
    };

    if !is_image_mime(sniffed) {
        return Err(ReadImageError::NotAnImage {
            path: file_path.to_string(),
            sniffed: sniffed.to_string(),
            declared: declared.to_string(),
        });
    }

    if sniffed == declared {
        return Ok(result);
    }

    debug!(path = file_path, declared, sniffed, "correcting read image mime type");

    let ToolResult { content, extra } = result;
    let content = content
        .into_iter()
        .map(|block| match block {
            ContentBlock::Image { data, .. } => ContentBlock::image(data, sniffed),
            ContentBlock::Text { text } if READ_IMAGE_HEADER_RE.is_match(&text) => {
                ContentBlock::text(read_image_header(sniffed))
            }
            other => other,
        })
        .collect();

    Ok(ToolResult { content, extra })
}
