//! Performance benchmarks for the readiness hot paths
//!
//! Run with: cargo bench
//!
//! Motion samples arrive every 150 ms and stills every 450 ms, so these
//! mainly guard against regressions in per-sample scoring and still
//! downscaling.

use aquacapture::config::ReadinessConfig;
use aquacapture::detector::prepare_still;
use aquacapture::engine::ReadinessEngine;
use aquacapture::quality::AlignmentTracker;
use aquacapture::testing::{shaking_samples, synthetic_card_still, tilted_sample};
use aquacapture::types::{FiducialResult, MotionSample};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::time::Instant;

/// Mixed stream: level, tilted and shaking readings
fn generate_motion_stream(len: usize) -> Vec<MotionSample> {
    let mut samples = Vec::with_capacity(len);
    let shake = shaking_samples(len, 0.6);
    for (i, shaking) in shake.into_iter().enumerate() {
        let sample = match i % 3 {
            0 => MotionSample::level(),
            1 => tilted_sample((i % 90) as f32),
            _ => shaking,
        };
        samples.push(sample);
    }
    samples
}

fn bench_alignment_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("Alignment Scoring");

    for len in [64usize, 1024] {
        let stream = generate_motion_stream(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("tracker_update", len), &stream, |b, stream| {
            b.iter(|| {
                let mut tracker = AlignmentTracker::new(0.35);
                for sample in stream {
                    let _ = tracker.update(black_box(*sample));
                }
                tracker.score()
            });
        });
    }

    group.finish();
}

fn bench_engine_inputs(c: &mut Criterion) {
    let stream = generate_motion_stream(256);
    let config = ReadinessConfig::default();

    c.bench_function("engine_motion_and_fiducial_inputs", |b| {
        b.iter(|| {
            let t0 = Instant::now();
            let mut engine = ReadinessEngine::new(&config);
            engine.set_camera_ready(true, t0);
            for (i, sample) in stream.iter().enumerate() {
                let now = t0 + Duration::from_millis(150 * i as u64);
                engine.on_motion_sample(*sample, now);
                if i % 3 == 0 {
                    engine.on_fiducial_result(black_box(FiducialResult::new(4, 0.9, true)), now);
                }
                engine.tick(now);
            }
            engine.snapshot()
        });
    });
}

fn bench_prepare_still(c: &mut Criterion) {
    let mut group = c.benchmark_group("Still Preparation");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let sizes = [(480, 640, "within_bounds"), (1080, 1240, "downscale_1080"), (2160, 2480, "downscale_4k")];
    for (width, height, name) in sizes {
        let still = synthetic_card_still(width, height);
        group.throughput(Throughput::Bytes(still.len() as u64));
        group.bench_with_input(BenchmarkId::new("prepare_still", name), &still, |b, still| {
            b.iter(|| prepare_still(black_box(still), 640, 70).expect("prepare failed"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_alignment_tracker, bench_engine_inputs, bench_prepare_still);
criterion_main!(benches);
