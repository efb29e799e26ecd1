use std::path::Path;

use anyhow::{Context, Result};
use imgsan_core::images::ImageProcessor;
use imgsan_core::images::mime::sniff_mime;
use tracing::info;

pub async fn run(
    processor: &ImageProcessor,
    file: &Path,
    out: &Path,
    max_side: u32,
    quality: u8,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let mime_type = sniff_mime(&bytes).unwrap_or("application/octet-stream");

    let resized = processor
        .resize(&bytes, mime_type, max_side, quality)
        .await
        .with_context(|| format!("resize {}", file.display()))?;

    tokio::fs::write(out, &resized.bytes)
        .await
        .with_context(|| format!("write {}", out.display()))?;

    info!(
        input_bytes = bytes.len(),
        output_bytes = resized.bytes.len(),
        "resized image"
    );
    println!("{} {} bytes", resized.mime_type, resized.bytes.len());
    Ok(())
}
