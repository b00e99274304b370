//! Shared filtering primitives over grayscale rasters.
//!
//! All filters operate on single-channel buffers, treat borders by clamping
//! coordinates (edge replication) and return new buffers. Multi-channel
//! input is rejected with `UnsupportedChannels`; callers convert with
//! [`RasterBuffer::to_gray`] first.

use crate::raster::{RasterBuffer, Rect};
use crate::util::{RidgekitError, RidgekitResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn require_gray(image: &RasterBuffer) -> RidgekitResult<()> {
    if !image.is_gray() {
        return Err(RidgekitError::UnsupportedChannels {
            channels: image.channels(),
        });
    }
    Ok(())
}

/// Builds a normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`.
pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(1e-3);
    let radius = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0.0f32;
    for i in -radius..=radius {
        let w = (-(i * i) as f32 / denom).exp();
        kernel.push(w);
        sum += w;
    }
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian blur of a grayscale image.
pub fn gaussian_blur(image: &RasterBuffer, sigma: f32) -> RidgekitResult<RasterBuffer> {
    require_gray(image)?;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;
    let src = image.data();

    // Horizontal pass into f32, vertical pass back to u8.
    let mut tmp = vec![0.0f32; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, w) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, width as i64 - 1) as usize;
                acc += f32::from(row[sx]) * w;
            }
            tmp[y * width + x] = acc;
        }
    }

    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, w) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as usize;
                acc += tmp[sy * width + x] * w;
            }
            out[y * width + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    RasterBuffer::gray(out, image.width(), image.height())
}

/// Horizontal and vertical Sobel gradients of a grayscale image.
///
/// Returns `(gx, gy)` as row-major f32 planes the same size as the input.
pub fn sobel_gradients(image: &RasterBuffer) -> RidgekitResult<(Vec<f32>, Vec<f32>)> {
    require_gray(image)?;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.data();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, width as i64 - 1) as usize;
        let cy = y.clamp(0, height as i64 - 1) as usize;
        f32::from(src[cy * width + cx])
    };

    let mut gx = vec![0.0f32; width * height];
    let mut gy = vec![0.0f32; width * height];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let tl = at(x - 1, y - 1);
            let tc = at(x, y - 1);
            let tr = at(x + 1, y - 1);
            let ml = at(x - 1, y);
            let mr = at(x + 1, y);
            let bl = at(x - 1, y + 1);
            let bc = at(x, y + 1);
            let br = at(x + 1, y + 1);
            let idx = y as usize * width + x as usize;
            gx[idx] = (tr + 2.0 * mr + br) - (tl + 2.0 * ml + bl);
            gy[idx] = (bl + 2.0 * bc + br) - (tl + 2.0 * tc + tr);
        }
    }
    Ok((gx, gy))
}

/// Four-neighbor Laplacian response of a grayscale image.
pub fn laplacian_response(image: &RasterBuffer) -> RidgekitResult<Vec<f32>> {
    require_gray(image)?;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.data();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, width as i64 - 1) as usize;
        let cy = y.clamp(0, height as i64 - 1) as usize;
        f32::from(src[cy * width + cx])
    };

    let mut out = vec![0.0f32; width * height];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let center = at(x, y);
            out[y as usize * width + x as usize] =
                at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * center;
        }
    }
    Ok(out)
}

/// Edge-preserving bilateral filter of a grayscale image.
///
/// `radius` bounds the spatial window; `sigma_spatial` weights distance and
/// `sigma_range` weights intensity difference. With the `rayon` feature the
/// rows are processed in parallel; results are identical either way.
pub fn bilateral_filter(
    image: &RasterBuffer,
    radius: u32,
    sigma_spatial: f32,
    sigma_range: f32,
) -> RidgekitResult<RasterBuffer> {
    require_gray(image)?;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.data();
    let radius = radius.max(1) as i64;
    let sigma_spatial = sigma_spatial.max(1e-3);
    let sigma_range = sigma_range.max(1e-3);

    // Precomputed lookup tables keep the inner loop to two multiplies.
    let spatial_denom = 2.0 * sigma_spatial * sigma_spatial;
    let window = (2 * radius + 1) as usize;
    let mut spatial = vec![0.0f32; window * window];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = (dx * dx + dy * dy) as f32;
            spatial[(dy + radius) as usize * window + (dx + radius) as usize] =
                (-d2 / spatial_denom).exp();
        }
    }
    let range_denom = 2.0 * sigma_range * sigma_range;
    let mut range = [0.0f32; 256];
    for (diff, w) in range.iter_mut().enumerate() {
        *w = (-((diff * diff) as f32) / range_denom).exp();
    }

    let filter_row = |y: usize, out_row: &mut [u8]| {
        for (x, out_px) in out_row.iter_mut().enumerate() {
            let center = src[y * width + x];
            let mut acc = 0.0f32;
            let mut weight = 0.0f32;
            for dy in -radius..=radius {
                let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
                for dx in -radius..=radius {
                    let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
                    let sample = src[sy * width + sx];
                    let diff = i16::from(sample) - i16::from(center);
                    let w = spatial[(dy + radius) as usize * window + (dx + radius) as usize]
                        * range[diff.unsigned_abs() as usize];
                    acc += f32::from(sample) * w;
                    weight += w;
                }
            }
            *out_px = (acc / weight).round().clamp(0.0, 255.0) as u8;
        }
    };

    let mut out = vec![0u8; width * height];
    #[cfg(feature = "rayon")]
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| filter_row(y, row));
    #[cfg(not(feature = "rayon"))]
    for (y, row) in out.chunks_mut(width).enumerate() {
        filter_row(y, row);
    }

    RasterBuffer::gray(out, image.width(), image.height())
}

/// Bilinear resize of a grayscale image to an exact target size.
pub fn resize_bilinear(
    image: &RasterBuffer,
    new_width: u32,
    new_height: u32,
) -> RidgekitResult<RasterBuffer> {
    require_gray(image)?;
    if new_width == 0 || new_height == 0 {
        return Err(RidgekitError::InvalidDimensions {
            width: new_width,
            height: new_height,
        });
    }
    let src_w = image.width() as usize;
    let src_h = image.height() as usize;
    let src = image.data();
    let scale_x = src_w as f32 / new_width as f32;
    let scale_y = src_h as f32 / new_height as f32;

    let mut out = vec![0u8; new_width as usize * new_height as usize];
    for y in 0..new_height as usize {
        // Sample at pixel centers so a same-size resize is the identity.
        let fy = ((y as f32 + 0.5) * scale_y - 0.5).max(0.0);
        let y0 = (fy as usize).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let ty = fy - y0 as f32;
        for x in 0..new_width as usize {
            let fx = ((x as f32 + 0.5) * scale_x - 0.5).max(0.0);
            let x0 = (fx as usize).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let tx = fx - x0 as f32;

            let p00 = f32::from(src[y0 * src_w + x0]);
            let p01 = f32::from(src[y0 * src_w + x1]);
            let p10 = f32::from(src[y1 * src_w + x0]);
            let p11 = f32::from(src[y1 * src_w + x1]);
            let top = p00 + (p01 - p00) * tx;
            let bottom = p10 + (p11 - p10) * tx;
            let value = top + (bottom - top) * ty;
            out[y * new_width as usize + x] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    RasterBuffer::gray(out, new_width, new_height)
}

/// 256-bin intensity histogram of a grayscale image.
pub fn histogram256(image: &RasterBuffer) -> RidgekitResult<[u32; 256]> {
    require_gray(image)?;
    let mut hist = [0u32; 256];
    for &px in image.data() {
        hist[px as usize] += 1;
    }
    Ok(hist)
}

/// Mean absolute grayscale difference between two same-sized images.
pub fn mean_abs_diff(a: &RasterBuffer, b: &RasterBuffer) -> RidgekitResult<f32> {
    require_gray(a)?;
    require_gray(b)?;
    if a.width() != b.width() || a.height() != b.height() {
        return Err(RidgekitError::LengthMismatch {
            expected: a.data().len(),
            got: b.data().len(),
            context: "frame",
        });
    }
    let sum: u64 = a
        .data()
        .iter()
        .zip(b.data().iter())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    Ok(sum as f32 / a.data().len() as f32)
}

/// Mean Sobel gradient magnitude inside a rectangle.
pub(crate) fn region_edge_energy(
    gx: &[f32],
    gy: &[f32],
    width: usize,
    rect: Rect,
) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let idx = y as usize * width + x as usize;
            sum += (gx[idx] * gx[idx] + gy[idx] * gy[idx]).sqrt();
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 7 + y * 3) % 256) as u8);
            }
        }
        RasterBuffer::gray(data, width, height).unwrap()
    }

    #[test]
    fn gaussian_blur_preserves_flat_image() {
        let flat = RasterBuffer::gray_filled(16, 12, 90).unwrap();
        let blurred = gaussian_blur(&flat, 1.2).unwrap();
        assert!(blurred.data().iter().all(|&px| px == 90));
    }

    #[test]
    fn laplacian_is_zero_on_flat_image() {
        let flat = RasterBuffer::gray_filled(8, 8, 40).unwrap();
        let response = laplacian_response(&flat).unwrap();
        assert!(response.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn sobel_detects_vertical_edge() {
        let mut data = vec![0u8; 8 * 8];
        for y in 0..8 {
            for x in 4..8 {
                data[y * 8 + x] = 255;
            }
        }
        let image = RasterBuffer::gray(data, 8, 8).unwrap();
        let (gx, gy) = sobel_gradients(&image).unwrap();
        // Strong horizontal gradient at the edge column, none vertically.
        let idx = 4 * 8 + 4;
        assert!(gx[idx].abs() > 100.0);
        assert!(gy[idx].abs() < 1e-3);
    }

    #[test]
    fn bilateral_preserves_constant_regions() {
        let flat = RasterBuffer::gray_filled(10, 10, 120).unwrap();
        let filtered = bilateral_filter(&flat, 2, 1.4, 24.0).unwrap();
        assert!(filtered.data().iter().all(|&px| px == 120));
    }

    #[test]
    fn resize_same_size_is_identity() {
        let image = gradient_image(12, 9);
        let resized = resize_bilinear(&image, 12, 9).unwrap();
        assert_eq!(resized.data(), image.data());
    }

    #[test]
    fn resize_changes_dimensions() {
        let image = gradient_image(20, 10);
        let resized = resize_bilinear(&image, 10, 5).unwrap();
        assert_eq!(resized.width(), 10);
        assert_eq!(resized.height(), 5);
    }

    #[test]
    fn histogram_counts_all_pixels() {
        let image = gradient_image(16, 16);
        let hist = histogram256(&image).unwrap();
        let total: u32 = hist.iter().sum();
        assert_eq!(total, 256);
    }

    #[test]
    fn mean_abs_diff_of_identical_images_is_zero() {
        let image = gradient_image(8, 8);
        assert_eq!(mean_abs_diff(&image, &image).unwrap(), 0.0);
    }

    #[test]
    fn filters_reject_multichannel_input() {
        let rgb = RasterBuffer::new(vec![0u8; 4 * 4 * 3], 4, 4, 3).unwrap();
        assert!(matches!(
            gaussian_blur(&rgb, 1.0),
            Err(RidgekitError::UnsupportedChannels { channels: 3 })
        ));
    }
}
