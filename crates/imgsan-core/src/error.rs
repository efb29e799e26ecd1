//! Error types for the image pipeline.
//!
//! `ImageError` is block-local: the sanitizer turns it into a text
//! placeholder using its `Display` output. `ReadImageError` is raised to the
//! caller and is never swallowed.

use std::time::Duration;

use thiserror::Error;

/// Failures while probing or resizing a single image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decode: {0}")]
    Decode(String),

    #[error("resize: {0}")]
    Resize(String),

    #[error("encode: {0}")]
    Encode(String),

    #[error("resized output is not a recognized image (detected: {detected})")]
    UnrecognizedOutput { detected: String },

    #[error("native image codec is not available in this build")]
    NativeUnavailable,

    #[error("image still exceeds {max_bytes} bytes after resize ({bytes} bytes)")]
    TooLarge { bytes: usize, max_bytes: usize },

    #[error("failed to run {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}ms", timeout.as_millis())]
    ToolTimeout { program: String, timeout: Duration },

    #[error("{program} output exceeded {limit} bytes")]
    ToolOutputTooLarge { program: String, limit: usize },

    #[error("{program} exited with status {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("{program} returned unexpected output: {output}")]
    MalformedToolOutput { program: String, output: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("image task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Unrecoverable problems with an image produced by a direct file read.
#[derive(Debug, Error)]
pub enum ReadImageError {
    #[error("read: image payload is empty ({path})")]
    EmptyPayload { path: String },

    #[error("read: file looks like {sniffed} but was treated as {declared} ({path})")]
    NotAnImage {
        path: String,
        sniffed: String,
        declared: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_program_and_limit() {
        let err = ImageError::ToolTimeout {
            program: "sips".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "sips timed out after 10000ms");
    }

    #[test]
    fn test_read_errors_include_path() {
        let err = ReadImageError::EmptyPayload {
            path: "/tmp/a.png".to_string(),
        };
        assert!(err.to_string().contains("/tmp/a.png"));

        let err = ReadImageError::NotAnImage {
            path: "notes.png".to_string(),
            sniffed: "application/pdf".to_string(),
            declared: "image/png".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("application/pdf"));
        assert!(msg.contains("notes.png"));
    }
}
