//! Benchmarks for the Prism feature extractors and store.
//!
//! Run with: cargo bench -p prism-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array3;
use prism_core::config::{EdgeConfig, EntropyConfig, KeypointConfig};
use prism_core::features::{
    ColorHistogramExtractor, ColorSpaceExtractor, EdgeMapExtractor, EntropyMapExtractor,
    FeatureExtractor, KeypointOverlayExtractor,
};
use prism_core::{Dataset, FeatureData, FeatureStore, ImageId, RawImage};

/// 256 × 256 synthetic image with smooth gradients and a few bright blobs.
fn sample_image() -> RawImage {
    let centers = [(64.0f32, 64.0f32), (180.0, 90.0), (120.0, 200.0)];
    RawImage::from_array(Array3::from_shape_fn((256, 256, 3), |(y, x, c)| {
        let blob: f32 = centers
            .iter()
            .map(|&(cy, cx)| {
                let d2 = (y as f32 - cy).powi(2) + (x as f32 - cx).powi(2);
                200.0 * (-d2 / 128.0).exp()
            })
            .sum();
        let base = ((x + y * (c + 1)) % 48) as f32;
        (base + blob).min(255.0) as u8
    }))
}

fn bench_extractor(c: &mut Criterion, name: &str, extractor: &dyn FeatureExtractor) {
    let image = sample_image();
    c.bench_function(name, |b| {
        b.iter(|| {
            let _ = extractor.extract(black_box(&image));
        })
    });
}

fn benchmark_color_space(c: &mut Criterion) {
    bench_extractor(c, "color_space_256px", &ColorSpaceExtractor);
}

fn benchmark_histogram(c: &mut Criterion) {
    bench_extractor(c, "color_histogram_256px", &ColorHistogramExtractor);
}

fn benchmark_edges(c: &mut Criterion) {
    bench_extractor(
        c,
        "edge_map_256px",
        &EdgeMapExtractor::new(EdgeConfig::default()),
    );
}

fn benchmark_entropy(c: &mut Criterion) {
    bench_extractor(
        c,
        "entropy_map_256px",
        &EntropyMapExtractor::new(EntropyConfig::default()),
    );
}

fn benchmark_keypoints(c: &mut Criterion) {
    bench_extractor(
        c,
        "keypoint_overlay_256px",
        &KeypointOverlayExtractor::new(KeypointConfig::default()),
    );
}

fn benchmark_store_upsert(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = FeatureStore::new(dir.path(), false);
    let id = ImageId::new("bench");
    let data = FeatureData::U8x3(sample_image().into_array());

    c.bench_function("store_upsert_image_256px", |b| {
        b.iter(|| {
            let _ = store.upsert(&id, Dataset::Image, black_box(&data));
        })
    });
}

criterion_group!(
    benches,
    benchmark_color_space,
    benchmark_histogram,
    benchmark_edges,
    benchmark_entropy,
    benchmark_keypoints,
    benchmark_store_upsert,
);
criterion_main!(benches);
