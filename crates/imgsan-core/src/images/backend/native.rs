//! In-process image backend built on `image` + `fast_image_resize`.
//!
//! Decoding and encoding are CPU-bound, so every call runs on the blocking
//! pool. Builds without the `native` feature keep the type but fail every
//! call with [`ImageError::NativeUnavailable`], which sends resizes to the
//! external tool.

use super::{BackendKind, ImageBackend};
use crate::error::ImageError;
use crate::images::ImageMetadata;
use crate::images::resize::ResizeRequest;

/// Output encoding chosen from the input MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Webp,
    Png,
}

impl OutputFormat {
    /// JPEG and WebP keep their format; everything else becomes PNG.
    pub fn for_mime(mime_type: &str) -> Self {
        match mime_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => OutputFormat::Jpeg,
            "image/webp" => OutputFormat::Webp,
            _ => OutputFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImageBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn metadata(&self, bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || codec::dimensions(&bytes)).await?
    }

    async fn resize(
        &self,
        bytes: &[u8],
        mime_type: &str,
        request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        let bytes = bytes.to_vec();
        let format = OutputFormat::for_mime(mime_type);
        let request = *request;
        tokio::task::spawn_blocking(move || codec::resize(&bytes, format, &request)).await?
    }
}

#[cfg(feature = "native")]
mod codec {
    use std::io::Cursor;

    use fast_image_resize as fir;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::codecs::webp::WebPEncoder;
    use image::{DynamicImage, ExtendedColorType, ImageEncoder as _, RgbaImage};

    use super::OutputFormat;
    use crate::error::ImageError;
    use crate::images::ImageMetadata;
    use crate::images::resize::{ResizeRequest, fit_within};

    fn decode_err(e: impl ToString) -> ImageError {
        ImageError::Decode(e.to_string())
    }

    fn resize_err(e: impl ToString) -> ImageError {
        ImageError::Resize(e.to_string())
    }

    fn encode_err(e: impl ToString) -> ImageError {
        ImageError::Encode(e.to_string())
    }

    fn reader(bytes: &[u8]) -> Result<image::ImageReader<Cursor<&[u8]>>, ImageError> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(decode_err)
    }

    pub(super) fn dimensions(bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        let (width, height) = reader(bytes)?.into_dimensions().map_err(decode_err)?;
        Ok(ImageMetadata::new(width, height))
    }

    pub(super) fn resize(
        bytes: &[u8],
        format: OutputFormat,
        request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        let img = reader(bytes)?.decode().map_err(decode_err)?;
        let (dst_w, dst_h) = fit_within(
            img.width(),
            img.height(),
            request.max_side,
            request.without_enlargement,
        );

        let scaled = if (dst_w, dst_h) == (img.width(), img.height()) {
            img
        } else {
            DynamicImage::ImageRgba8(lanczos_rgba(&img, dst_w, dst_h)?)
        };
        encode(&scaled, format, request.quality)
    }

    /// Lanczos3 downscale in RGBA8 space.
    fn lanczos_rgba(
        src: &DynamicImage,
        dst_w: u32,
        dst_h: u32,
    ) -> Result<RgbaImage, ImageError> {
        let rgba = src.to_rgba8();
        let (src_w, src_h) = rgba.dimensions();
        let src_view =
            fir::images::Image::from_vec_u8(src_w, src_h, rgba.into_raw(), fir::PixelType::U8x4)
                .map_err(resize_err)?;

        let mut dst_view = fir::images::Image::new(dst_w, dst_h, fir::PixelType::U8x4);
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
        fir::Resizer::new()
            .resize(&src_view, &mut dst_view, Some(&options))
            .map_err(resize_err)?;

        RgbaImage::from_raw(dst_w, dst_h, dst_view.into_vec())
            .ok_or_else(|| resize_err("output buffer does not match dimensions"))
    }

    /// Encodes `img` as `format`. JPEG drops alpha; PNG keeps it only when the
    /// source has it; WebP is lossless RGBA.
    fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError> {
        let keep_alpha = match format {
            OutputFormat::Jpeg => false,
            OutputFormat::Webp => true,
            OutputFormat::Png => img.color().has_alpha(),
        };
        let (w, h) = (img.width(), img.height());
        let (raw, color) = if keep_alpha {
            (img.to_rgba8().into_raw(), ExtendedColorType::Rgba8)
        } else {
            (img.to_rgb8().into_raw(), ExtendedColorType::Rgb8)
        };

        let mut buf = Vec::new();
        let written = match format {
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
                .write_image(&raw, w, h, color),
            OutputFormat::Webp => {
                WebPEncoder::new_lossless(&mut buf).write_image(&raw, w, h, color)
            }
            OutputFormat::Png => {
                PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::Adaptive)
                    .write_image(&raw, w, h, color)
            }
        };
        written.map_err(encode_err)?;
        Ok(buf)
    }
}

#[cfg(not(feature = "native"))]
mod codec {
    use super::OutputFormat;
    use crate::error::ImageError;
    use crate::images::ImageMetadata;
    use crate::images::resize::ResizeRequest;

    pub(super) fn dimensions(_bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        Err(ImageError::NativeUnavailable)
    }

    pub(super) fn resize(
        _bytes: &[u8],
        _format: OutputFormat,
        _request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        Err(ImageError::NativeUnavailable)
    }
}
