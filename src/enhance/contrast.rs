//! Tile-based adaptive local contrast normalization.
//!
//! The image is divided into a grid of tiles; each tile gets a clip-limited
//! histogram-equalization lookup table, and pixels are remapped by bilinear
//! interpolation between the four surrounding tile tables. Clipping bounds
//! how much any single intensity can be stretched, which lifts local ridge
//! contrast without blowing out highlights.

use crate::raster::RasterBuffer;
use crate::util::{RidgekitError, RidgekitResult};

/// Per-tile remapping table.
struct TileLut {
    map: [u8; 256],
}

fn build_tile_lut(hist: &[u32; 256], pixel_count: u32, clip_limit: f32) -> TileLut {
    let mut clipped = *hist;

    // Clip bins above the limit and redistribute the excess evenly.
    let limit = ((clip_limit * pixel_count as f32 / 256.0).ceil() as u32).max(1);
    let mut excess = 0u32;
    for bin in clipped.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bump = excess / 256;
    let mut remainder = (excess % 256) as usize;
    for bin in clipped.iter_mut() {
        *bin += bump;
        if remainder > 0 {
            *bin += 1;
            remainder -= 1;
        }
    }

    let mut map = [0u8; 256];
    let mut cdf = 0u64;
    let mut cdf_min = 0u64;
    let mut seen_min = false;
    let total = u64::from(pixel_count);
    for (value, &count) in clipped.iter().enumerate() {
        cdf += u64::from(count);
        if !seen_min && cdf > 0 {
            cdf_min = cdf;
            seen_min = true;
        }
        let denom = total.saturating_sub(cdf_min);
        map[value] = if denom == 0 {
            // Degenerate single-intensity tile: identity mapping.
            value as u8
        } else {
            (((cdf - cdf_min) * 255 + denom / 2) / denom) as u8
        };
    }
    TileLut { map }
}

/// Applies clip-limited adaptive contrast over a `grid` x `grid` tile layout.
pub fn adaptive_local_contrast(
    image: &RasterBuffer,
    grid: u32,
    clip_limit: f32,
) -> RidgekitResult<RasterBuffer> {
    if !image.is_gray() {
        return Err(RidgekitError::UnsupportedChannels {
            channels: image.channels(),
        });
    }
    let width = image.width() as usize;
    let height = image.height() as usize;
    let grid = grid.clamp(1, 32) as usize;
    let tiles_x = grid.min(width);
    let tiles_y = grid.min(height);
    let src = image.data();

    // Even tile partition: boundaries at `tx * width / tiles_x`, so the
    // rounding spreads across tiles and every tile stays inside the image.
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        let y0 = ty * height / tiles_y;
        let y1 = (ty + 1) * height / tiles_y;
        for tx in 0..tiles_x {
            let x0 = tx * width / tiles_x;
            let x1 = (tx + 1) * width / tiles_x;
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[src[y * width + x] as usize] += 1;
                }
            }
            let count = ((x1 - x0) * (y1 - y0)) as u32;
            luts.push(build_tile_lut(&hist, count.max(1), clip_limit));
        }
    }

    let lut_at = |tx: usize, ty: usize, value: u8| -> f32 {
        f32::from(luts[ty * tiles_x + tx].map[value as usize])
    };

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let mut out = vec![0u8; width * height];
    for y in 0..height {
        let fy = ((y as f32 + 0.5) / tile_h - 0.5).max(0.0);
        let ty0 = (fy as usize).min(tiles_y - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = fy - ty0 as f32;
        for x in 0..width {
            let fx = ((x as f32 + 0.5) / tile_w - 0.5).max(0.0);
            let tx0 = (fx as usize).min(tiles_x - 1);
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = fx - tx0 as f32;

            let value = src[y * width + x];
            let top = lut_at(tx0, ty0, value) * (1.0 - wx) + lut_at(tx1, ty0, value) * wx;
            let bottom = lut_at(tx0, ty1, value) * (1.0 - wx) + lut_at(tx1, ty1, value) * wx;
            let mapped = top * (1.0 - wy) + bottom * wy;
            out[y * width + x] = mapped.round().clamp(0.0, 255.0) as u8;
        }
    }
    RasterBuffer::gray(out, image.width(), image.height())
}
