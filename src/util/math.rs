//! Mathematical helpers shared by the scoring stages.

/// Wraps an undirected ridge angle in degrees to the range [0, 180).
pub(crate) fn wrap_orientation_deg(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 180.0;
    if wrapped < 0.0 {
        wrapped += 180.0;
    }
    wrapped
}

/// Saturating map of a non-negative response onto [0, 1).
///
/// Monotonically increasing in `value`; `knee` is the response that maps
/// to 0.5.
pub(crate) fn saturate(value: f32, knee: f32) -> f32 {
    if value <= 0.0 {
        return 0.0;
    }
    value / (value + knee)
}

/// Clamps a score into [0, 1].
pub(crate) fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Mean and population variance of a slice, `(0.0, 0.0)` when empty.
pub(crate) fn mean_variance(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var)
}

/// L2-normalizes a vector in place; all-zero input is left untouched.
pub(crate) fn l2_normalize(values: &mut [f32]) {
    let norm_sq: f32 = values.iter().map(|v| v * v).sum();
    if norm_sq <= f32::EPSILON {
        return;
    }
    let inv = norm_sq.sqrt().recip();
    for v in values.iter_mut() {
        *v *= inv;
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Defined as 0.0 when either vector is all-zero, so degenerate feature
/// sub-vectors compare cleanly instead of producing NaN.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
