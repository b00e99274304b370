use criterion::{criterion_group, criterion_main, Criterion};
use ridgekit::{
    EnhancementPipeline, FeatureExtractor, Frame, LivenessDetector, QualityAssessor, RasterBuffer,
};
use std::hint::black_box;

fn make_image(width: u32, height: u32) -> RasterBuffer {
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let ridge = if (x / 3) % 2 == 0 { 80 } else { 180 };
            let value = (ridge + ((x * 13) ^ (y * 7)) % 23) as u8;
            data.push(value);
        }
    }
    RasterBuffer::gray(data, width, height).unwrap()
}

fn bench_quality(c: &mut Criterion) {
    let assessor = QualityAssessor::default();
    let image = make_image(480, 640);
    c.bench_function("quality_assess_480x640", |b| {
        b.iter(|| assessor.assess(black_box(&image)))
    });
}

fn bench_enhance(c: &mut Criterion) {
    let pipeline = EnhancementPipeline::default();
    let image = make_image(480, 640);
    c.bench_function("enhance_480x640", |b| {
        b.iter(|| pipeline.enhance(black_box(&image), None))
    });
}

fn bench_extract(c: &mut Criterion) {
    let pipeline = EnhancementPipeline::default();
    let extractor = FeatureExtractor::default();
    let enhanced = pipeline.enhance(&make_image(480, 640), None).image;
    c.bench_function("extract_enhanced", |b| {
        b.iter(|| extractor.extract(black_box(&enhanced)).unwrap())
    });
}

fn bench_liveness(c: &mut Criterion) {
    let detector = LivenessDetector::default();
    let frames: Vec<Frame> = (0..10u64)
        .map(|i| Frame::new(make_image(160, 120), (i + 1) * 33))
        .collect();
    c.bench_function("liveness_10_frames", |b| {
        b.iter(|| detector.evaluate(black_box(&frames)))
    });
}

criterion_group!(
    benches,
    bench_quality,
    bench_enhance,
    bench_extract,
    bench_liveness
);
criterion_main!(benches);
