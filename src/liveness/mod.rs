//! Heuristic live-finger detection over a frame burst.
//!
//! Three sub-scores are computed from the capture-preparation frame
//! window: motion (real tissue shows small, irregular inter-frame
//! difference), texture (skin micro-pattern is irregular where printed or
//! screen-displayed reproductions are periodic) and consistency (moderate
//! frame-to-frame variation scores high, near-identical frames score low).
//! The weighted composite gates the live/spoof decision; with fewer than
//! two frames the detector fails closed with sentinel sub-scores.

use crate::capture::Frame;
use crate::raster::filter::mean_abs_diff;
use crate::raster::RasterBuffer;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{clamp_unit, mean_variance, saturate};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Sentinel sub-score for conditions the detector cannot judge.
pub const UNDECIDED_SCORE: f32 = -1.0;

/// Weights, thresholds and calibration knobs for liveness scoring.
#[derive(Clone, Copy, Debug)]
pub struct LivenessConfig {
    /// Weight of the motion sub-score in the composite.
    pub motion_weight: f32,
    /// Weight of the texture sub-score.
    pub texture_weight: f32,
    /// Weight of the consistency sub-score.
    pub consistency_weight: f32,
    /// Composite confidence at or above which the burst counts as live.
    pub live_threshold: f32,
    /// Mean absolute inter-frame difference mapping to a motion base of 0.5.
    pub motion_knee: f32,
    /// Mean difference above which motion is treated as camera shake and
    /// decayed quadratically.
    pub motion_ceiling: f32,
    /// Pairwise similarity below which consistency scores 0.
    pub consistency_floor: f32,
    /// Pairwise similarity at which consistency peaks; identical frames
    /// (similarity 1.0) score 0 again.
    pub consistency_peak: f32,
    /// Product policy: when true, callers should surface a failed check as
    /// a warning instead of hard-blocking the capture.
    pub warn_only: bool,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            motion_weight: 0.4,
            texture_weight: 0.3,
            consistency_weight: 0.3,
            live_threshold: 0.6,
            motion_knee: 60.0,
            motion_ceiling: 150.0,
            consistency_floor: 0.5,
            consistency_peak: 0.9,
            warn_only: true,
        }
    }
}

/// Per-capture liveness judgment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LivenessResult {
    /// Inter-frame motion sub-score in [0, 1], or [`UNDECIDED_SCORE`].
    pub motion_score: f32,
    /// Micro-texture sub-score in [0, 1], or [`UNDECIDED_SCORE`].
    pub texture_score: f32,
    /// Frame-consistency sub-score in [0, 1], or [`UNDECIDED_SCORE`].
    pub consistency_score: f32,
    /// Weighted composite of the sub-scores.
    pub confidence: f32,
    /// True iff `confidence >= live_threshold`.
    pub is_live: bool,
}

impl LivenessResult {
    fn undecided() -> Self {
        Self {
            motion_score: UNDECIDED_SCORE,
            texture_score: UNDECIDED_SCORE,
            consistency_score: UNDECIDED_SCORE,
            confidence: 0.0,
            is_live: false,
        }
    }
}

/// Stateless liveness detector.
#[derive(Clone, Copy, Debug, Default)]
pub struct LivenessDetector {
    config: LivenessConfig,
}

impl LivenessDetector {
    /// Creates a detector with the given configuration.
    pub fn new(config: LivenessConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// Evaluates a time-ordered frame burst.
    ///
    /// Fails gracefully with a sentinel result when fewer than two frames
    /// are available (the normal state right after a detection trigger).
    pub fn evaluate(&self, frames: &[Frame]) -> LivenessResult {
        let _span = trace_span!("liveness_evaluate", frames = frames.len()).entered();
        if frames.len() < 2 {
            trace_event!("liveness_undecided", frames = frames.len());
            return LivenessResult::undecided();
        }

        let grays: Vec<RasterBuffer> = frames.iter().map(|f| f.image.to_gray()).collect();
        let pair_diffs = self.pair_diffs(&grays);

        let motion = self.motion_score(&pair_diffs);
        let texture = self.texture_score(grays.last().expect("frames is non-empty"));
        let consistency = self.consistency_score(&pair_diffs);

        let cfg = &self.config;
        let confidence = clamp_unit(
            cfg.motion_weight * motion.max(0.0)
                + cfg.texture_weight * texture.max(0.0)
                + cfg.consistency_weight * consistency.max(0.0),
        );
        let is_live = confidence >= cfg.live_threshold;

        trace_event!(
            "liveness_scores",
            motion = motion,
            texture = texture,
            consistency = consistency,
            confidence = confidence,
            is_live = is_live
        );

        LivenessResult {
            motion_score: motion,
            texture_score: texture,
            consistency_score: consistency,
            confidence,
            is_live,
        }
    }

    /// Capture-flow policy for a finished evaluation: a failed check
    /// blocks the capture only when the configuration is not warn-only.
    pub fn should_block(&self, result: &LivenessResult) -> bool {
        !result.is_live && !self.config.warn_only
    }

    /// Mean absolute difference per consecutive frame pair. Pairs whose
    /// frames disagree in size are skipped rather than failing the burst.
    fn pair_diffs(&self, grays: &[RasterBuffer]) -> Vec<f32> {
        #[cfg(feature = "rayon")]
        {
            grays
                .par_windows(2)
                .filter_map(|pair| mean_abs_diff(&pair[0], &pair[1]).ok())
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            grays
                .windows(2)
                .filter_map(|pair| mean_abs_diff(&pair[0], &pair[1]).ok())
                .collect()
        }
    }

    /// Motion: a saturating function of the mean pairwise difference,
    /// boosted slightly by non-trivial variance across pairs and decayed
    /// when the difference is implausibly large for a held finger.
    fn motion_score(&self, pair_diffs: &[f32]) -> f32 {
        if pair_diffs.is_empty() {
            return 0.0;
        }
        let cfg = &self.config;
        let (mean, variance) = mean_variance(pair_diffs);
        let base = saturate(mean, cfg.motion_knee);
        let var_factor = 0.8 + 0.2 * saturate(variance, 25.0);
        let mut score = base * var_factor;
        if mean > cfg.motion_ceiling {
            let ratio = cfg.motion_ceiling / mean;
            score *= ratio * ratio;
        }
        clamp_unit(score)
    }

    /// Texture: normalized entropy of the 8-neighbor local binary pattern
    /// histogram of the newest frame. Irregular skin micro-texture spreads
    /// codes across many bins; halftone dots, pixel grids and other
    /// periodic reproduction artifacts concentrate them.
    fn texture_score(&self, gray: &RasterBuffer) -> f32 {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        if width < 3 || height < 3 {
            return 0.0;
        }
        let src = gray.data();

        let mut hist = [0u32; 256];
        let mut total = 0u32;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = src[y * width + x];
                let mut code = 0u8;
                let neighbors = [
                    src[(y - 1) * width + x - 1],
                    src[(y - 1) * width + x],
                    src[(y - 1) * width + x + 1],
                    src[y * width + x + 1],
                    src[(y + 1) * width + x + 1],
                    src[(y + 1) * width + x],
                    src[(y + 1) * width + x - 1],
                    src[y * width + x - 1],
                ];
                for (bit, &neighbor) in neighbors.iter().enumerate() {
                    if neighbor >= center {
                        code |= 1 << bit;
                    }
                }
                hist[code as usize] += 1;
                total += 1;
            }
        }
        if total == 0 {
            return 0.0;
        }

        let mut entropy = 0.0f32;
        for &count in hist.iter() {
            if count == 0 {
                continue;
            }
            let p = count as f32 / total as f32;
            entropy -= p * p.log2();
        }
        // 256 codes bound the entropy at 8 bits.
        clamp_unit(entropy / 8.0)
    }

    /// Consistency: pairwise similarity aggregated across the burst and
    /// scored non-monotonically. Moderate variation peaks; near-identical
    /// frames (a static reproduction) and wildly dissimilar frames both
    /// score low.
    fn consistency_score(&self, pair_diffs: &[f32]) -> f32 {
        if pair_diffs.is_empty() {
            return 0.0;
        }
        let cfg = &self.config;
        let (mean_diff, _) = mean_variance(pair_diffs);
        let similarity = 1.0 - clamp_unit(mean_diff / 255.0);

        if similarity >= cfg.consistency_peak {
            let span = (1.0 - cfg.consistency_peak).max(1e-6);
            clamp_unit((1.0 - similarity) / span)
        } else {
            let span = (cfg.consistency_peak - cfg.consistency_floor).max(1e-6);
            clamp_unit((similarity - cfg.consistency_floor) / span)
        }
    }
}
