//! Device alignment scoring from accelerometer samples
//!
//! Each sample is reduced to a composite in [0,1] from three geometric
//! penalties (tilt away from flat, gravity magnitude drift, lateral
//! component) minus a jitter penalty proportional to the delta from the
//! previous sample. The composite is exponentially smoothed into the running
//! alignment score.

use crate::errors::CaptureError;
use crate::types::MotionSample;

/// Floor for the vector magnitude before normalizing
const MIN_MAGNITUDE: f32 = 1e-3;

const TILT_WEIGHT: f32 = 0.5;
const GRAVITY_WEIGHT: f32 = 0.3;
const LATERAL_WEIGHT: f32 = 0.2;

/// Jitter penalty at or above `max_accel_delta`
const MAX_JITTER_PENALTY: f32 = 0.45;

/// Share of the previous score kept on each update
const SMOOTHING_RETAIN: f32 = 0.55;

#[inline]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-sample breakdown, mostly useful for logging and tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentMetrics {
    pub gravity_drift: f32,
    pub tilt_penalty: f32,
    pub lateral_motion: f32,
    pub raw_score: f32,
    pub jitter_penalty: f32,
    pub composite: f32,
}

/// Score a single sample against its predecessor without touching any state
pub fn score_sample(
    sample: &MotionSample,
    previous: Option<&MotionSample>,
    max_accel_delta: f32,
) -> AlignmentMetrics {
    let magnitude = sample.magnitude().max(MIN_MAGNITUDE);
    let nx = sample.x / magnitude;
    let ny = sample.y / magnitude;
    let nz = sample.z / magnitude;

    let gravity_drift = (magnitude - 1.0).abs().min(1.0);
    let tilt_penalty = (nz.abs() - 1.0).abs().min(1.0);
    let lateral_motion = (nx * nx + ny * ny).sqrt().min(1.0);

    let raw_score = clamp01(
        1.0 - (TILT_WEIGHT * tilt_penalty
            + GRAVITY_WEIGHT * gravity_drift
            + LATERAL_WEIGHT * lateral_motion),
    );

    let jitter_penalty = match previous {
        Some(prev) => clamp01(sample.distance_to(prev) / max_accel_delta) * MAX_JITTER_PENALTY,
        None => 0.0,
    };

    AlignmentMetrics {
        gravity_drift,
        tilt_penalty,
        lateral_motion,
        raw_score,
        jitter_penalty,
        composite: clamp01(raw_score - jitter_penalty),
    }
}

/// Running, smoothed alignment score over a motion stream
#[derive(Debug, Clone)]
pub struct AlignmentTracker {
    max_accel_delta: f32,
    score: f32,
    previous: Option<MotionSample>,
    samples_seen: u64,
    rejected: u64,
}

impl AlignmentTracker {
    pub fn new(max_accel_delta: f32) -> Self {
        Self {
            max_accel_delta,
            score: 0.0,
            previous: None,
            samples_seen: 0,
            rejected: 0,
        }
    }

    /// Fold one sample into the score.
    ///
    /// Non-finite samples are rejected and leave the score untouched.
    pub fn update(&mut self, sample: MotionSample) -> Result<AlignmentMetrics, CaptureError> {
        if !sample.is_finite() {
            self.rejected += 1;
            return Err(CaptureError::InvalidMotionSample(format!(
                "non-finite reading ({}, {}, {})",
                sample.x, sample.y, sample.z
            )));
        }

        let metrics = score_sample(&sample, self.previous.as_ref(), self.max_accel_delta);

        self.score = if self.samples_seen == 0 {
            metrics.composite
        } else {
            clamp01(self.score * SMOOTHING_RETAIN + metrics.composite * (1.0 - SMOOTHING_RETAIN))
        };
        self.previous = Some(sample);
        self.samples_seen += 1;

        Ok(metrics)
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn reset(&mut self) {
        self.score = 0.0;
        self.previous = None;
        self.samples_seen = 0;
        self.rejected = 0;
    }
}
