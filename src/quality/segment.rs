//! Pluggable finger-region segmentation.
//!
//! The coverage and orientation sub-metrics only consume a foreground mask,
//! so the rule that produces the mask is a strategy behind a trait. The
//! shipped default marks tiles whose mean gradient magnitude clears a floor,
//! which separates ridge texture from flat background without any model.

use crate::raster::filter::{region_edge_energy, sobel_gradients};
use crate::raster::{RasterBuffer, Rect};
use crate::util::RidgekitResult;

/// Tile-resolution foreground mask produced by a segmenter.
#[derive(Clone, Debug)]
pub struct RegionMask {
    mask: Vec<bool>,
    width: u32,
    height: u32,
}

impl RegionMask {
    /// Creates a mask from row-major tile flags.
    pub fn new(mask: Vec<bool>, width: u32, height: u32) -> Self {
        debug_assert_eq!(mask.len(), width as usize * height as usize);
        Self {
            mask,
            width,
            height,
        }
    }

    /// Mask width in tiles.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in tiles.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fraction of tiles marked foreground, in [0, 1].
    pub fn coverage(&self) -> f32 {
        if self.mask.is_empty() {
            return 0.0;
        }
        let fg = self.mask.iter().filter(|&&m| m).count();
        fg as f32 / self.mask.len() as f32
    }

    /// Dominant axis of the foreground region, in degrees from the x-axis
    /// in [0, 180). Returns `None` when the region is empty or has no
    /// measurable elongation (an isotropic blob has no dominant axis).
    pub fn principal_axis_deg(&self) -> Option<f32> {
        let mut count = 0usize;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        for (idx, &fg) in self.mask.iter().enumerate() {
            if fg {
                sum_x += (idx % self.width as usize) as f64;
                sum_y += (idx / self.width as usize) as f64;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let cx = sum_x / count as f64;
        let cy = sum_y / count as f64;

        let mut mu20 = 0.0f64;
        let mut mu02 = 0.0f64;
        let mut mu11 = 0.0f64;
        for (idx, &fg) in self.mask.iter().enumerate() {
            if fg {
                let dx = (idx % self.width as usize) as f64 - cx;
                let dy = (idx / self.width as usize) as f64 - cy;
                mu20 += dx * dx;
                mu02 += dy * dy;
                mu11 += dx * dy;
            }
        }

        let elongation = ((mu20 - mu02) * (mu20 - mu02) + 4.0 * mu11 * mu11).sqrt();
        if elongation < 1e-9 {
            return None;
        }
        let theta = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
        let mut deg = theta.to_degrees() as f32;
        if deg < 0.0 {
            deg += 180.0;
        }
        Some(deg)
    }
}

/// Strategy producing a foreground mask from a grayscale image.
pub trait RegionSegmenter: Send + Sync {
    /// Segments the finger region of a single-channel image.
    fn segment(&self, image: &RasterBuffer) -> RidgekitResult<RegionMask>;
}

/// Default segmenter: per-tile mean gradient magnitude against a floor.
#[derive(Clone, Copy, Debug)]
pub struct EdgeDensitySegmenter {
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Minimum mean gradient magnitude for a foreground tile.
    pub energy_floor: f32,
}

impl Default for EdgeDensitySegmenter {
    fn default() -> Self {
        Self {
            tile_size: 8,
            energy_floor: 12.0,
        }
    }
}

impl RegionSegmenter for EdgeDensitySegmenter {
    fn segment(&self, image: &RasterBuffer) -> RidgekitResult<RegionMask> {
        let (gx, gy) = sobel_gradients(image)?;
        let tile = self.tile_size.max(1);
        let tiles_x = image.width().div_ceil(tile);
        let tiles_y = image.height().div_ceil(tile);

        let mut mask = Vec::with_capacity(tiles_x as usize * tiles_y as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let x = tx * tile;
                let y = ty * tile;
                let rect = Rect::new(
                    x,
                    y,
                    tile.min(image.width() - x),
                    tile.min(image.height() - y),
                );
                let energy = region_edge_energy(&gx, &gy, image.width() as usize, rect);
                mask.push(energy >= self.energy_floor);
            }
        }
        Ok(RegionMask::new(mask, tiles_x, tiles_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_background_segments_empty() {
        let flat = RasterBuffer::gray_filled(64, 64, 128).unwrap();
        let mask = EdgeDensitySegmenter::default().segment(&flat).unwrap();
        assert_eq!(mask.coverage(), 0.0);
        assert!(mask.principal_axis_deg().is_none());
    }

    #[test]
    fn textured_stripe_is_detected_vertically() {
        // Vertical ridge-textured band in the middle of a flat background.
        let width = 64u32;
        let height = 64u32;
        let mut data = vec![128u8; (width * height) as usize];
        for y in 0..height {
            for x in 24..40u32 {
                let value = if (x / 2) % 2 == 0 { 40 } else { 220 };
                data[(y * width + x) as usize] = value;
            }
        }
        let image = RasterBuffer::gray(data, width, height).unwrap();
        let mask = EdgeDensitySegmenter::default().segment(&image).unwrap();

        let coverage = mask.coverage();
        assert!(coverage > 0.15 && coverage < 0.6, "coverage {coverage}");

        let axis = mask.principal_axis_deg().unwrap();
        let from_vertical = (axis - 90.0).abs();
        assert!(from_vertical < 10.0, "axis {axis}");
    }
}
