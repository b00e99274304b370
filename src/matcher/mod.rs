//! Feature-vector matching.
//!
//! Similarity is a weighted sum of the cosine similarities of the two
//! feature sub-vectors. The decision threshold is a closed lower bound:
//! a similarity exactly at the threshold is a match. Comparing against the
//! multiple reference images of one enrolled identity keeps the maximum
//! score, because any single good reference should suffice.

use crate::features::FeatureVector;
use crate::raster::RasterBuffer;
use crate::trace::{trace_event, trace_span};
use crate::util::math::cosine_similarity;
use crate::util::{RidgekitError, RidgekitResult};

/// Weights and threshold for matching.
#[derive(Clone, Copy, Debug)]
pub struct MatchConfig {
    /// Weight of the orientation-histogram cosine similarity.
    pub orientation_weight: f32,
    /// Weight of the texture-vector cosine similarity.
    pub texture_weight: f32,
    /// Match decision threshold (closed lower bound).
    pub threshold: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            orientation_weight: 0.6,
            texture_weight: 0.4,
            threshold: 0.7,
        }
    }
}

/// Outcome of one probe/reference comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Weighted cosine similarity in [0, 1].
    pub similarity: f32,
    /// True iff `similarity >= threshold`.
    pub is_match: bool,
    /// Equal to `similarity`; reported separately for display contracts.
    pub confidence: f32,
}

/// Read-only view of the external enrollment storage.
///
/// The core holds no enrollment state; the application supplies reference
/// images by value through this narrow interface.
pub trait ReferenceStore {
    /// Returns all reference images enrolled for `id`.
    fn reference_images_for(&self, id: &str) -> Vec<RasterBuffer>;
}

/// Stateless feature matcher.
#[derive(Clone, Copy, Debug, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with the given configuration.
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Returns the match decision for a similarity score.
    pub fn decide(&self, similarity: f32) -> bool {
        similarity >= self.config.threshold
    }

    /// Compares two feature vectors; symmetric in its arguments.
    ///
    /// Errs when the sub-vector lengths disagree (features extracted with
    /// different configurations are not comparable). Cosine similarity of
    /// an all-zero sub-vector is 0, so degenerate vectors compare cleanly.
    pub fn compare(
        &self,
        probe: &FeatureVector,
        reference: &FeatureVector,
    ) -> RidgekitResult<MatchResult> {
        if probe.orientation_histogram.len() != reference.orientation_histogram.len() {
            return Err(RidgekitError::LengthMismatch {
                expected: probe.orientation_histogram.len(),
                got: reference.orientation_histogram.len(),
                context: "orientation histogram",
            });
        }
        if probe.texture_vector.len() != reference.texture_vector.len() {
            return Err(RidgekitError::LengthMismatch {
                expected: probe.texture_vector.len(),
                got: reference.texture_vector.len(),
                context: "texture vector",
            });
        }

        let _span = trace_span!("match_compare").entered();
        let cfg = &self.config;
        let orientation_sim = cosine_similarity(
            &probe.orientation_histogram,
            &reference.orientation_histogram,
        );
        let texture_sim = cosine_similarity(&probe.texture_vector, &reference.texture_vector);
        let similarity = (cfg.orientation_weight * orientation_sim
            + cfg.texture_weight * texture_sim)
            .clamp(0.0, 1.0);
        let is_match = self.decide(similarity);

        trace_event!(
            "match_scored",
            orientation_sim = orientation_sim,
            texture_sim = texture_sim,
            similarity = similarity,
            is_match = is_match
        );

        Ok(MatchResult {
            similarity,
            is_match,
            confidence: similarity,
        })
    }

    /// Compares a probe against every reference of one identity and keeps
    /// the maximum-similarity result. Returns `None` for an empty
    /// reference set.
    pub fn best_match(
        &self,
        probe: &FeatureVector,
        references: &[FeatureVector],
    ) -> RidgekitResult<Option<MatchResult>> {
        let mut best: Option<MatchResult> = None;
        for reference in references {
            let result = self.compare(probe, reference)?;
            let better = match best {
                Some(current) => result.similarity > current.similarity,
                None => true,
            };
            if better {
                best = Some(result);
            }
        }
        Ok(best)
    }
}
