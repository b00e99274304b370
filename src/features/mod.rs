//! Similarity feature extraction.
//!
//! A `FeatureVector` is a compact descriptor of an enhanced capture: a
//! magnitude-weighted histogram of undirected ridge orientations plus
//! per-patch intensity statistics. Both sub-vectors are L2-normalized
//! independently so the matcher's weighting is interpretable regardless of
//! absolute intensity scale.

use crate::raster::filter::sobel_gradients;
use crate::raster::RasterBuffer;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{l2_normalize, wrap_orientation_deg};
use crate::util::RidgekitResult;

/// Tunables for feature extraction.
#[derive(Clone, Copy, Debug)]
pub struct FeatureConfig {
    /// Number of orientation histogram bins over [0°, 180°).
    pub orientation_bins: usize,
    /// Patch grid edge length for the texture vector (grid x grid patches).
    pub texture_grid: u32,
    /// Weight each pixel's histogram contribution by gradient magnitude.
    pub magnitude_weighted: bool,
    /// Gradient magnitude below which a pixel contributes no orientation.
    pub magnitude_floor: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            orientation_bins: 12,
            texture_grid: 8,
            magnitude_weighted: true,
            magnitude_floor: 1.0,
        }
    }
}

/// Descriptor of one enhanced image.
///
/// Each sub-vector has unit Euclidean norm, or is all-zero when the source
/// had no variance (a valid degenerate output, not an error).
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    /// Binned distribution of undirected ridge-gradient angles.
    pub orientation_histogram: Vec<f32>,
    /// Per-patch mean and standard deviation, row-major patch order.
    pub texture_vector: Vec<f32>,
}

/// Stateless feature extractor.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    /// Creates an extractor with the given configuration.
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extracts a feature vector from an (enhanced) image.
    ///
    /// Multi-channel input is reduced to grayscale first. Errs only on
    /// input the filters cannot process; zero-variance images produce
    /// all-zero sub-vectors.
    pub fn extract(&self, image: &RasterBuffer) -> RidgekitResult<FeatureVector> {
        let _span = trace_span!(
            "feature_extract",
            width = image.width(),
            height = image.height()
        )
        .entered();

        let gray = image.to_gray();
        let orientation_histogram = self.orientation_histogram(&gray)?;
        let texture_vector = self.texture_vector(&gray);

        trace_event!(
            "features_done",
            orientation_bins = self.config.orientation_bins,
            texture_len = texture_vector.len()
        );

        Ok(FeatureVector {
            orientation_histogram,
            texture_vector,
        })
    }

    /// Undirected gradient-orientation histogram over [0°, 180°).
    fn orientation_histogram(&self, gray: &RasterBuffer) -> RidgekitResult<Vec<f32>> {
        let bins = self.config.orientation_bins.max(1);
        let (gx, gy) = sobel_gradients(gray)?;
        let bin_width = 180.0 / bins as f32;

        let mut hist = vec![0.0f32; bins];
        for (&dx, &dy) in gx.iter().zip(gy.iter()) {
            let magnitude = (dx * dx + dy * dy).sqrt();
            if magnitude < self.config.magnitude_floor {
                continue;
            }
            // Ridge orientation is undirected: angle and angle + 180° are
            // the same ridge flow.
            let angle = wrap_orientation_deg(dy.atan2(dx).to_degrees());
            let bin = ((angle / bin_width) as usize).min(bins - 1);
            hist[bin] += if self.config.magnitude_weighted {
                magnitude
            } else {
                1.0
            };
        }
        l2_normalize(&mut hist);
        Ok(hist)
    }

    /// Per-patch mean and standard deviation over a fixed grid.
    fn texture_vector(&self, gray: &RasterBuffer) -> Vec<f32> {
        let grid = self.config.texture_grid.clamp(1, 64);
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let tiles_x = (grid as usize).min(width);
        let tiles_y = (grid as usize).min(height);
        let src = gray.data();

        // Even patch partition; boundary patches absorb the rounding so
        // any valid image splits into exactly grid x grid patches.
        let mut out = Vec::with_capacity(tiles_x * tiles_y * 2);
        for ty in 0..tiles_y {
            let y0 = ty * height / tiles_y;
            let y1 = (ty + 1) * height / tiles_y;
            for tx in 0..tiles_x {
                let x0 = tx * width / tiles_x;
                let x1 = (tx + 1) * width / tiles_x;

                let mut sum = 0.0f64;
                let mut sum_sq = 0.0f64;
                let count = ((x1 - x0) * (y1 - y0)) as f64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let v = f64::from(src[y * width + x]);
                        sum += v;
                        sum_sq += v * v;
                    }
                }
                let mean = sum / count;
                let var = (sum_sq / count - mean * mean).max(0.0);
                out.push(mean as f32);
                out.push(var.sqrt() as f32);
            }
        }
        l2_normalize(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(values: &[f32]) -> f32 {
        values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    fn vertical_ridges(width: u32, height: u32) -> RasterBuffer {
        let mut data = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                data.push(if (x / 2) % 2 == 0 { 50 } else { 200 });
            }
        }
        RasterBuffer::gray(data, width, height).unwrap()
    }

    #[test]
    fn sub_vectors_have_unit_norm() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&vertical_ridges(64, 64)).unwrap();
        assert!((norm(&features.orientation_histogram) - 1.0).abs() < 1e-4);
        assert!((norm(&features.texture_vector) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_variance_image_yields_zero_orientation_histogram() {
        let extractor = FeatureExtractor::default();
        let flat = RasterBuffer::gray_filled(32, 32, 128).unwrap();
        let features = extractor.extract(&flat).unwrap();
        assert!(features.orientation_histogram.iter().all(|&v| v == 0.0));
        // Patch means are non-zero, so the texture vector still normalizes.
        assert!((norm(&features.texture_vector) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn vertical_ridges_concentrate_in_one_bin() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&vertical_ridges(64, 64)).unwrap();
        // Gradients of vertical stripes point along x (angle ~0° / 180°),
        // which folds into the first bin.
        let first = features.orientation_histogram[0];
        let rest: f32 = features.orientation_histogram[1..].iter().sum();
        assert!(first > 0.99, "first bin {first}, rest {rest}");
    }

    #[test]
    fn histogram_length_follows_config() {
        let extractor = FeatureExtractor::new(FeatureConfig {
            orientation_bins: 16,
            ..FeatureConfig::default()
        });
        let features = extractor.extract(&vertical_ridges(32, 32)).unwrap();
        assert_eq!(features.orientation_histogram.len(), 16);
    }

    #[test]
    fn grid_unfriendly_dimensions_extract_cleanly() {
        let extractor = FeatureExtractor::default();
        let features = extractor
            .extract(&RasterBuffer::gray_filled(27, 45, 100).unwrap())
            .unwrap();
        assert_eq!(features.texture_vector.len(), 8 * 8 * 2);
    }

    #[test]
    fn texture_vector_length_is_two_per_patch() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&vertical_ridges(64, 64)).unwrap();
        assert_eq!(features.texture_vector.len(), 8 * 8 * 2);
    }
}
