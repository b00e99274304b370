use ridgekit::{EnhancementPipeline, FeatureExtractor, Matcher, RasterBuffer, ReferenceStore};
use std::collections::HashMap;

/// Synthetic ridge pattern: oriented sinusoidal stripes with a little
/// deterministic per-pixel variation, roughly what an enhanced finger
/// crop looks like.
fn ridged_image(width: u32, height: u32, angle_rad: f32, phase: f32) -> RasterBuffer {
    let (sin, cos) = angle_rad.sin_cos();
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let along = x as f32 * cos + y as f32 * sin;
            let ridge = (along * 0.7 + phase).sin();
            let jitter = ((x * 31 + y * 17) % 7) as f32;
            let value = 128.0 + 58.0 * ridge + jitter;
            data.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }
    RasterBuffer::gray(data, width, height).unwrap()
}

#[test]
fn same_image_matches_itself_near_perfectly() {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();
    let matcher = Matcher::default();

    let image = ridged_image(240, 320, 0.2, 0.0);
    let enhanced_a = pipeline.enhance(&image, None);
    let enhanced_b = pipeline.enhance(&image, None);
    let probe = extractor.extract(&enhanced_a.image).unwrap();
    let reference = extractor.extract(&enhanced_b.image).unwrap();

    let result = matcher.compare(&probe, &reference).unwrap();
    assert!(
        result.similarity >= 0.95,
        "identity similarity {}",
        result.similarity
    );
    assert!(result.is_match);
}

#[test]
fn different_ridge_flows_score_below_identity() {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();
    let matcher = Matcher::default();

    let probe_img = ridged_image(240, 320, 0.2, 0.0);
    let other_img = ridged_image(240, 320, 1.3, 2.0);

    let probe = extractor
        .extract(&pipeline.enhance(&probe_img, None).image)
        .unwrap();
    let same = extractor
        .extract(&pipeline.enhance(&probe_img, None).image)
        .unwrap();
    let other = extractor
        .extract(&pipeline.enhance(&other_img, None).image)
        .unwrap();

    let identity = matcher.compare(&probe, &same).unwrap().similarity;
    let cross = matcher.compare(&probe, &other).unwrap().similarity;
    assert!(
        cross < identity,
        "cross {cross} should score below identity {identity}"
    );
}

#[test]
fn feature_norms_are_unit_after_enhancement() {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();

    let image = ridged_image(200, 280, 0.4, 1.0);
    let features = extractor
        .extract(&pipeline.enhance(&image, None).image)
        .unwrap();

    let norm = |values: &[f32]| values.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm(&features.orientation_histogram) - 1.0).abs() < 1e-3);
    assert!((norm(&features.texture_vector) - 1.0).abs() < 1e-3);
}

#[test]
fn best_match_over_references_takes_the_maximum() {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();
    let matcher = Matcher::default();

    let probe_img = ridged_image(240, 320, 0.2, 0.0);
    let probe = extractor
        .extract(&pipeline.enhance(&probe_img, None).image)
        .unwrap();

    let references: Vec<_> = [1.3f32, 0.2, 0.9]
        .iter()
        .map(|&angle| {
            let img = ridged_image(240, 320, angle, 0.0);
            extractor
                .extract(&pipeline.enhance(&img, None).image)
                .unwrap()
        })
        .collect();

    let best = matcher.best_match(&probe, &references).unwrap().unwrap();
    // The reference sharing the probe's ridge flow must win.
    let direct = matcher.compare(&probe, &references[1]).unwrap();
    assert_eq!(best.similarity, direct.similarity);
    assert!(best.similarity >= 0.95);
}

/// In-memory enrollment storage, as an application embedding the library
/// would supply it.
struct InMemoryStore {
    enrolled: HashMap<String, Vec<RasterBuffer>>,
}

impl ReferenceStore for InMemoryStore {
    fn reference_images_for(&self, id: &str) -> Vec<RasterBuffer> {
        self.enrolled.get(id).cloned().unwrap_or_default()
    }
}

#[test]
fn reference_store_backs_the_enrollment_match_flow() {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();
    let matcher = Matcher::default();

    let mut enrolled = HashMap::new();
    enrolled.insert(
        "finger-1".to_string(),
        vec![
            ridged_image(240, 320, 0.9, 0.0),
            ridged_image(240, 320, 0.2, 0.0),
        ],
    );
    let store = InMemoryStore { enrolled };

    let probe = extractor
        .extract(&pipeline.enhance(&ridged_image(240, 320, 0.2, 0.0), None).image)
        .unwrap();
    let references: Vec<_> = store
        .reference_images_for("finger-1")
        .iter()
        .map(|img| {
            extractor
                .extract(&pipeline.enhance(img, None).image)
                .unwrap()
        })
        .collect();

    let best = matcher.best_match(&probe, &references).unwrap().unwrap();
    assert!(best.is_match, "enrolled finger rejected: {best:?}");

    // Unknown identities yield no references, hence no decision.
    let empty: Vec<_> = store.reference_images_for("finger-9");
    assert!(empty.is_empty());
}

#[test]
fn enhancement_is_reproducible_end_to_end() {
    let pipeline = EnhancementPipeline::default();
    let image = ridged_image(180, 240, 0.3, 0.5);
    let a = pipeline.enhance(&image, None);
    let b = pipeline.enhance(&image, None);
    assert_eq!(a.image.data(), b.image.data());
    assert!(!a.degraded);
}
