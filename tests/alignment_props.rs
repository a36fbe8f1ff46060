//! Property-Based Tests for Alignment Scoring
//!
//! Verifies score bounds and convergence of the smoothed alignment score
//! using proptest for input generation and shrinking.

use aquacapture::config::ReadinessConfig;
use aquacapture::engine::ReadinessEngine;
use aquacapture::quality::{score_sample, AlignmentTracker};
use aquacapture::testing::shaking_samples;
use aquacapture::types::{ArmState, FiducialResult, MotionSample, Transition};
use proptest::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

fn any_component() -> impl Strategy<Value = f32> {
    prop_oneof![
        -20.0f32..20.0,
        Just(0.0f32),
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(1.0e30f32),
        Just(-1.0e30f32),
    ]
}

fn any_sample() -> impl Strategy<Value = MotionSample> {
    (any_component(), any_component(), any_component()).prop_map(|(x, y, z)| MotionSample::new(x, y, z))
}

proptest! {
    /// The running score never leaves [0,1], whatever the sensor reports
    #[test]
    fn score_stays_in_unit_range(samples in prop::collection::vec(any_sample(), 1..64)) {
        let mut tracker = AlignmentTracker::new(0.35);
        for sample in samples {
            let _ = tracker.update(sample);
            let score = tracker.score();
            prop_assert!((0.0..=1.0).contains(&score), "score {} after {:?}", score, sample);
        }
    }

    /// Every per-sample component is bounded for finite input
    #[test]
    fn metrics_are_bounded(
        x in -50.0f32..50.0, y in -50.0f32..50.0, z in -50.0f32..50.0,
        px in -50.0f32..50.0, py in -50.0f32..50.0, pz in -50.0f32..50.0,
    ) {
        let prev = MotionSample::new(px, py, pz);
        let m = score_sample(&MotionSample::new(x, y, z), Some(&prev), 0.35);
        for value in [m.gravity_drift, m.tilt_penalty, m.lateral_motion, m.raw_score, m.composite] {
            prop_assert!((0.0..=1.0).contains(&value));
        }
        prop_assert!((0.0..=0.45).contains(&m.jitter_penalty));
        prop_assert!(m.composite <= m.raw_score);
    }

    /// A still, level device converges toward 1 from any starting reading
    #[test]
    fn level_device_converges(start in any_sample()) {
        let mut tracker = AlignmentTracker::new(0.35);
        let _ = tracker.update(start);
        for _ in 0..12 {
            tracker.update(MotionSample::level()).unwrap();
        }
        prop_assert!(tracker.score() > 0.95, "score {}", tracker.score());
    }

    /// Shaking suppresses the score below the start threshold from the
    /// first jittery delta on, so arming never survives a shaking phone
    #[test]
    fn shaking_cannot_hold_arming(amplitude in 0.5f32..2.0, count in 2usize..40) {
        let t0 = Instant::now();
        let mut engine = ReadinessEngine::new(&ReadinessConfig::default());
        engine.set_camera_ready(true, t0);
        engine.on_fiducial_result(FiducialResult::new(4, 0.9, true), t0);

        for (i, sample) in shaking_samples(count, amplitude).into_iter().enumerate() {
            let transition = engine.on_motion_sample(sample, t0 + Duration::from_millis(150 * i as u64));
            if i >= 1 {
                prop_assert!(engine.alignment_score() < 0.55);
                prop_assert_ne!(transition, Some(Transition::Armed));
                prop_assert_ne!(engine.state(), ArmState::Arming);
            }
        }
    }
}
