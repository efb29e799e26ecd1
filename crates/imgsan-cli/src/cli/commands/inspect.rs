//! `sniff` and `probe` commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use imgsan_core::images::ImageProcessor;
use imgsan_core::images::mime::sniff_mime;

pub fn sniff(file: &Path) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    println!("{}", sniff_mime(&bytes).unwrap_or("unknown"));
    Ok(())
}

pub async fn probe(processor: &ImageProcessor, file: &Path) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;

    let Some(meta) = processor.probe(&bytes).await else {
        bail!(
            "could not read image dimensions of {} with the {} backend",
            file.display(),
            processor.backend_kind()
        );
    };

    println!("{}x{}", meta.width, meta.height);
    Ok(())
}
