//! Fixtures and fake backends shared by unit tests.

use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ImageMetadata;
use super::backend::{BackendKind, ImageBackend};
use super::resize::ResizeRequest;
use crate::error::ImageError;

fn gradient(width: u32, height: u32) -> image::DynamicImage {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    image::DynamicImage::ImageRgb8(img)
}

fn encode(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::Png)
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::Jpeg)
}

pub(crate) fn webp_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, image::ImageFormat::WebP)
}

pub(crate) fn decode_dimensions(bytes: &[u8]) -> (u32, u32) {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .unwrap()
        .into_dimensions()
        .unwrap()
}

/// Backend whose every call fails.
pub(crate) struct FailingBackend {
    kind: BackendKind,
}

impl FailingBackend {
    pub(crate) fn native() -> Self {
        Self {
            kind: BackendKind::Native,
        }
    }

    pub(crate) fn external() -> Self {
        Self {
            kind: BackendKind::ExternalTool,
        }
    }

    fn error(&self) -> ImageError {
        match self.kind {
            BackendKind::Native => ImageError::NativeUnavailable,
            BackendKind::ExternalTool => ImageError::ToolFailed {
                program: "sips".to_string(),
                status: 1,
                stderr: "boom".to_string(),
            },
        }
    }
}

impl ImageBackend for FailingBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn metadata(&self, _bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        Err(self.error())
    }

    async fn resize(
        &self,
        _bytes: &[u8],
        _mime_type: &str,
        _request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        Err(self.error())
    }
}

/// Backend that measures real input but returns canned resize output.
pub(crate) struct StubBackend {
    kind: BackendKind,
    output: Vec<u8>,
    resize_calls: AtomicUsize,
    last_request: Mutex<Option<ResizeRequest>>,
}

impl StubBackend {
    pub(crate) fn new(kind: BackendKind, output: Vec<u8>) -> Self {
        Self {
            kind,
            output,
            resize_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn resize_calls(&self) -> usize {
        self.resize_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<ResizeRequest> {
        *self.last_request.lock().unwrap()
    }
}

impl ImageBackend for StubBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn metadata(&self, bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        let (width, height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(ImageMetadata::new(width, height))
    }

    async fn resize(
        &self,
        _bytes: &[u8],
        _mime_type: &str,
        request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        self.resize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(*request);
        Ok(self.output.clone())
    }
}
