//! `sanitize` command: reads a tool-result JSON document and prints the
//! normalized result.

use std::io::Read as _;

use anyhow::{Context, Result};
use imgsan_core::ToolResult;
use imgsan_core::images::ImageProcessor;
use imgsan_core::pipeline::{ToolCall, process_tool_result};
use imgsan_core::sanitize::SanitizeOptions;

pub async fn run(
    processor: &ImageProcessor,
    opts: &SanitizeOptions,
    input: &str,
    tool: &str,
    path: Option<&str>,
) -> Result<()> {
    let raw = read_input(input)?;
    let result: ToolResult =
        serde_json::from_str(&raw).with_context(|| format!("parse tool result from {input}"))?;

    let mut call = ToolCall::new(tool);
    if let Some(path) = path {
        call = call.with_path(path);
    }

    let normalized = process_tool_result(processor, call, result, opts).await?;
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("read {input}"))
}
