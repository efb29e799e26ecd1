//! Entry point used by the tool execution loop.

use imgsan_types::ToolResult;

use crate::error::ReadImageError;
use crate::images::ImageProcessor;
use crate::images::backend::ImageBackend;
use crate::read_result::normalize_read_result;
use crate::sanitize::{SanitizeOptions, sanitize_tool_result};

/// Name of the read-file tool.
pub const READ_TOOL_NAME: &str = "read";

/// The tool invocation a result came from.
#[derive(Debug, Clone, Copy)]
pub struct ToolCall<'a> {
    pub name: &'a str,
    /// File path argument, for read calls.
    pub path: Option<&'a str>,
}

impl<'a> ToolCall<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, path: None }
    }

    #[must_use]
    pub fn with_path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn is_read(&self) -> bool {
        self.name.eq_ignore_ascii_case(READ_TOOL_NAME)
    }
}

/// Normalizes a tool result before it is forwarded downstream.
///
/// Read results get their MIME label repaired first; then every result has its
/// images sanitized under the tool's name.
///
/// # Errors
/// Only read-tool hard failures are returned; image problems anywhere else
/// become text placeholders.
pub async fn process_tool_result<N, E>(
    processor: &ImageProcessor<N, E>,
    call: ToolCall<'_>,
    result: ToolResult,
    opts: &SanitizeOptions,
) -> Result<ToolResult, ReadImageError>
where
    N: ImageBackend,
    E: ImageBackend,
{
    let result = if call.is_read() {
        normalize_read_result(result, call.path.unwrap_or("<unknown>"))?
    } else {
        result
    };

    let sanitized = sanitize_tool_result(processor, &result, call.name, opts).await;
    Ok(sanitized.into_owned())
}
