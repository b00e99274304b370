//! Capture-quality assessment.
//!
//! Four independent sub-metrics (blur, illumination, coverage, orientation)
//! combine into a weighted overall score, gated all-of: a capture passes
//! only when the overall score and every individual sub-score clear their
//! configured floors. A sub-metric that fails internally contributes 0.0
//! instead of aborting the assessment.

use crate::quality::segment::{EdgeDensitySegmenter, RegionSegmenter};
use crate::raster::filter::{histogram256, laplacian_response};
use crate::raster::RasterBuffer;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{clamp_unit, mean_variance, saturate};
use crate::util::RidgekitResult;

pub mod segment;

/// Weights and floors for quality scoring.
///
/// The four weights are expected to sum to 1; the floors are calibration
/// values, not proven biometric bounds.
#[derive(Clone, Copy, Debug)]
pub struct QualityConfig {
    /// Weight of the blur sub-score in the overall score.
    pub blur_weight: f32,
    /// Weight of the illumination sub-score.
    pub illumination_weight: f32,
    /// Weight of the coverage sub-score.
    pub coverage_weight: f32,
    /// Weight of the orientation sub-score.
    pub orientation_weight: f32,
    /// Laplacian-variance response mapping to a blur score of 0.5.
    pub blur_knee: f32,
    /// Minimum acceptable blur score.
    pub min_blur: f32,
    /// Minimum acceptable illumination score.
    pub min_illumination: f32,
    /// Minimum acceptable coverage score.
    pub min_coverage: f32,
    /// Minimum acceptable orientation score.
    pub min_orientation: f32,
    /// Minimum acceptable overall score.
    pub min_overall: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            blur_weight: 0.3,
            illumination_weight: 0.25,
            coverage_weight: 0.25,
            orientation_weight: 0.2,
            blur_knee: 300.0,
            min_blur: 0.45,
            min_illumination: 0.3,
            min_coverage: 0.08,
            min_orientation: 0.2,
            min_overall: 0.5,
        }
    }
}

impl QualityConfig {
    /// Applies the all-of gate: every sub-score and the overall score must
    /// clear its floor. A single badly failing metric fails the capture
    /// even when the weighted average is acceptable.
    pub fn gate(
        &self,
        blur: f32,
        illumination: f32,
        coverage: f32,
        orientation: f32,
        overall: f32,
    ) -> bool {
        blur >= self.min_blur
            && illumination >= self.min_illumination
            && coverage >= self.min_coverage
            && orientation >= self.min_orientation
            && overall >= self.min_overall
    }
}

/// Per-capture quality judgment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityResult {
    /// Focus/sharpness sub-score in [0, 1].
    pub blur_score: f32,
    /// Exposure sub-score in [0, 1].
    pub illumination_score: f32,
    /// Finger-region coverage sub-score in [0, 1].
    pub coverage_score: f32,
    /// Alignment-to-vertical sub-score in [0, 1].
    pub orientation_score: f32,
    /// Weighted combination of the four sub-scores.
    pub overall_score: f32,
    /// True when the all-of gate accepts the capture.
    pub passed: bool,
}

/// Stateless quality assessor with a pluggable region segmenter.
pub struct QualityAssessor {
    config: QualityConfig,
    segmenter: Box<dyn RegionSegmenter>,
}

impl Default for QualityAssessor {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl QualityAssessor {
    /// Creates an assessor with the default edge-density segmenter.
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            segmenter: Box::new(EdgeDensitySegmenter::default()),
        }
    }

    /// Replaces the segmentation strategy.
    pub fn with_segmenter(mut self, segmenter: Box<dyn RegionSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Assesses one captured image.
    ///
    /// Total over any valid `RasterBuffer` (zero-area inputs cannot be
    /// constructed); a sub-metric that fails internally scores 0.0.
    pub fn assess(&self, image: &RasterBuffer) -> QualityResult {
        let _span = trace_span!(
            "quality_assess",
            width = image.width(),
            height = image.height()
        )
        .entered();

        let gray = image.to_gray();
        let blur = self.blur_score(&gray).unwrap_or(0.0);
        let illumination = self.illumination_score(&gray).unwrap_or(0.0);
        let (coverage, orientation) = self.region_scores(&gray).unwrap_or((0.0, 0.0));

        let cfg = &self.config;
        let overall = clamp_unit(
            cfg.blur_weight * blur
                + cfg.illumination_weight * illumination
                + cfg.coverage_weight * coverage
                + cfg.orientation_weight * orientation,
        );
        let passed = cfg.gate(blur, illumination, coverage, orientation, overall);

        trace_event!(
            "quality_scores",
            blur = blur,
            illumination = illumination,
            coverage = coverage,
            orientation = orientation,
            overall = overall,
            passed = passed
        );

        QualityResult {
            blur_score: blur,
            illumination_score: illumination,
            coverage_score: coverage,
            orientation_score: orientation,
            overall_score: overall,
            passed,
        }
    }

    /// Focus via second-derivative edge energy: the variance of the
    /// Laplacian response rises with sharp ridge edges and collapses under
    /// defocus, mapped through a saturating curve.
    fn blur_score(&self, gray: &RasterBuffer) -> RidgekitResult<f32> {
        let response = laplacian_response(gray)?;
        let (_, variance) = mean_variance(&response);
        Ok(clamp_unit(saturate(variance, self.config.blur_knee)))
    }

    /// Exposure from the intensity histogram: a mean-brightness term, a
    /// spread term and a penalty for mass piled into the extreme bins.
    fn illumination_score(&self, gray: &RasterBuffer) -> RidgekitResult<f32> {
        let hist = histogram256(gray)?;
        let total = gray.data().len() as f32;

        let mut sum = 0.0f64;
        for (value, &count) in hist.iter().enumerate() {
            sum += value as f64 * f64::from(count);
        }
        let mean = (sum / f64::from(total)) as f32;

        let mut var = 0.0f64;
        for (value, &count) in hist.iter().enumerate() {
            let d = value as f64 - f64::from(mean);
            var += d * d * f64::from(count);
        }
        let std = (var / f64::from(total)).sqrt() as f32;

        let extreme: u32 = hist[..8].iter().sum::<u32>() + hist[248..].iter().sum::<u32>();
        let extreme_frac = extreme as f32 / total;

        let mean_term = 1.0 - (mean - 127.5).abs() / 127.5;
        let spread_term = clamp_unit(std / 50.0);
        // Up to 10% clipped pixels is tolerated; beyond that the score drops fast.
        let penalty = (extreme_frac - 0.10).max(0.0) * 1.5;
        Ok(clamp_unit(0.5 * mean_term + 0.5 * spread_term - penalty))
    }

    /// Coverage and orientation from the segmented finger region.
    ///
    /// Coverage is the foreground fraction. Orientation compares the
    /// region's dominant axis against vertical; a region with no
    /// measurable elongation counts as aligned.
    fn region_scores(&self, gray: &RasterBuffer) -> RidgekitResult<(f32, f32)> {
        let mask = self.segmenter.segment(gray)?;
        let coverage = clamp_unit(mask.coverage());
        if coverage == 0.0 {
            return Ok((0.0, 0.0));
        }
        let orientation = match mask.principal_axis_deg() {
            Some(axis) => {
                let from_vertical = (axis - 90.0).abs().min(90.0);
                1.0 - from_vertical / 90.0
            }
            None => 1.0,
        };
        Ok((coverage, clamp_unit(orientation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ridge_image(width: u32, height: u32) -> RasterBuffer {
        // Vertical stripes of period 4 px, a crude ridge pattern.
        let mut data = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                data.push(if (x / 2) % 2 == 0 { 60 } else { 190 });
            }
        }
        RasterBuffer::gray(data, width, height).unwrap()
    }

    #[test]
    fn sharp_ridges_score_high_on_blur() {
        let assessor = QualityAssessor::default();
        let result = assessor.assess(&ridge_image(64, 64));
        assert!(result.blur_score > 0.8, "blur {}", result.blur_score);
    }

    #[test]
    fn flat_image_scores_zero_blur_and_coverage() {
        let assessor = QualityAssessor::default();
        let flat = RasterBuffer::gray_filled(64, 64, 128).unwrap();
        let result = assessor.assess(&flat);
        assert_eq!(result.blur_score, 0.0);
        assert_eq!(result.coverage_score, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn underexposed_image_scores_low_illumination() {
        let assessor = QualityAssessor::default();
        let dark = RasterBuffer::gray_filled(32, 32, 5).unwrap();
        let result = assessor.assess(&dark);
        assert!(result.illumination_score < 0.1);
    }

    #[test]
    fn gate_is_all_of_not_any_of() {
        let cfg = QualityConfig::default();
        // High overall cannot rescue a badly failing coverage sub-score.
        assert!(!cfg.gate(0.9, 0.9, 0.02, 0.9, 0.9));
        assert!(cfg.gate(0.5, 0.5, 0.5, 0.5, 0.5));
        assert!(!cfg.gate(0.44, 0.9, 0.9, 0.9, 0.9));
    }

    #[test]
    fn full_frame_ridges_pass_the_gate() {
        let assessor = QualityAssessor::default();
        let result = assessor.assess(&ridge_image(128, 128));
        assert!(result.coverage_score > 0.9);
        assert!(result.orientation_score > 0.8);
        assert!(result.passed, "result {result:?}");
    }
}
