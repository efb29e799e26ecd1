//! Image classification, measurement and downscaling.

pub mod backend;
pub mod mime;
pub mod probe;
pub mod processor;
pub mod resize;
#[cfg(test)]
pub(crate) mod test_support;

pub use processor::ImageProcessor;

/// Pixel dimensions of a decoded image. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

impl ImageMetadata {
    /// Returns `None` when either side is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn max_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Whether both sides are at most `max_side`.
    pub fn fits_within(&self, max_side: u32) -> bool {
        self.width <= max_side && self.height <= max_side
    }
}
