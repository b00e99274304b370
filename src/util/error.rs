//! Error types for ridgekit.

use thiserror::Error;

/// Result alias for ridgekit operations.
pub type RidgekitResult<T> = std::result::Result<T, RidgekitError>;

/// Errors that can occur when running ridgekit algorithms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RidgekitError {
    /// Width or height is zero (or the product overflows).
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// The pixel buffer does not hold enough elements for the declared shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The channel count is not one of the supported layouts (1, 3 or 4).
    #[error("unsupported channel count: {channels}")]
    UnsupportedChannels { channels: u8 },
    /// A crop or patch region does not fit inside the image.
    #[error("region {width}x{height}+{x}+{y} out of bounds for {img_width}x{img_height} image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        img_width: u32,
        img_height: u32,
    },
    /// Two feature sub-vectors that must align have different lengths.
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        expected: usize,
        got: usize,
        context: &'static str,
    },
    /// Image decoding or encoding failed.
    #[cfg(feature = "image-io")]
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
