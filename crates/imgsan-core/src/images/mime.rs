//! MIME detection from magic bytes.
//!
//! Declared content types on tool output are never trusted; these helpers
//! classify the payload itself.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Standard-alphabet decoder that accepts payloads with or without `=`
/// padding.
pub(crate) const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Minimum number of bytes needed before a classification is attempted.
const MIN_SNIFF_BYTES: usize = 8;

/// Base64 characters decoded when sniffing an encoded payload.
/// 256 chars decode to 192 bytes, well past every supported signature.
const SNIFF_BASE64_CHARS: usize = 256;

/// Detects the MIME type of `bytes` from its magic-byte signature.
///
/// Accepts a prefix of the full payload. Returns `None` for short buffers and
/// for content with no known signature (plain text, for example).
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < MIN_SNIFF_BYTES {
        return None;
    }
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Detects the MIME type of a base64 payload by decoding only its prefix.
pub fn sniff_mime_base64(encoded: &str) -> Option<&'static str> {
    let prefix: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .take(SNIFF_BASE64_CHARS)
        .collect();

    // Truncated base64 only decodes cleanly on a 4-char boundary.
    let aligned = prefix.len() / 4 * 4;
    let bytes = BASE64_LENIENT.decode(&prefix[..aligned]).ok()?;
    sniff_mime(&bytes)
}

/// Whether `mime` names an image type.
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}
