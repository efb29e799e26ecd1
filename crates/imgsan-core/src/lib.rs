//! Core imgsan library: MIME sniffing, image backends, and tool-result
//! sanitization.

pub mod config;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod read_result;
pub mod sanitize;

pub use imgsan_types::{ContentBlock, ToolResult};
