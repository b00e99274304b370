//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. The core pipeline
//! never touches the filesystem; these helpers exist for CLIs, tests and
//! the fixed-format export path.

use crate::raster::RasterBuffer;
use crate::util::{RidgekitError, RidgekitResult};
use std::path::Path;

/// Creates a grayscale raster from an `image` grayscale buffer.
pub fn raster_from_gray_image(img: &image::GrayImage) -> RidgekitResult<RasterBuffer> {
    RasterBuffer::gray(img.as_raw().clone(), img.width(), img.height())
}

/// Creates a grayscale raster from any decoded image.
pub fn raster_from_dynamic_image(img: &image::DynamicImage) -> RidgekitResult<RasterBuffer> {
    let gray = img.to_luma8();
    raster_from_gray_image(&gray)
}

/// Loads an image from disk and converts it to a grayscale raster.
pub fn load_gray_raster<P: AsRef<Path>>(path: P) -> RidgekitResult<RasterBuffer> {
    let img = image::open(path).map_err(|err| RidgekitError::ImageIo {
        reason: err.to_string(),
    })?;
    raster_from_dynamic_image(&img)
}

/// Saves a grayscale raster to disk; the format follows the file extension.
pub fn save_gray_raster<P: AsRef<Path>>(raster: &RasterBuffer, path: P) -> RidgekitResult<()> {
    let gray = raster.to_gray();
    let img = image::GrayImage::from_raw(gray.width(), gray.height(), gray.into_data())
        .ok_or(RidgekitError::ImageIo {
            reason: "raster does not fit an image buffer".to_string(),
        })?;
    img.save(path).map_err(|err| RidgekitError::ImageIo {
        reason: err.to_string(),
    })
}
