//! Core data types shared by the readiness engine, the session actor and the
//! collaborator contracts.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of corner markers printed on a sample card
pub const MAX_FIDUCIALS: u8 = 4;

/// Accelerometer reading relative to gravity (magnitude ~1 when at rest)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Device lying flat and still
    pub fn level() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance between two readings
    pub fn distance_to(&self, other: &MotionSample) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Corner position of a fiducial marker on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CornerLabel {
    #[serde(rename = "tl")]
    TopLeft,
    #[serde(rename = "tr")]
    TopRight,
    #[serde(rename = "bl")]
    BottomLeft,
    #[serde(rename = "br")]
    BottomRight,
}

/// Position data reported by the detection service for one corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerMarker {
    /// Center in pixels of the (possibly downscaled) still
    pub cx: f32,
    pub cy: f32,
    /// Center normalized to 0..1
    pub x: f32,
    pub y: f32,
    /// Average marker side in pixels
    pub size: u32,
}

/// Outcome of one remote marker check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiducialResult {
    #[serde(rename = "detected")]
    pub detected_count: u8,
    #[serde(default)]
    pub corners: BTreeMap<CornerLabel, CornerMarker>,
    pub quality: f32,
    pub ready: bool,
}

impl FiducialResult {
    pub fn new(detected_count: u8, quality: f32, ready: bool) -> Self {
        Self {
            detected_count,
            corners: BTreeMap::new(),
            quality,
            ready,
        }
    }

    /// Sentinel applied when a check fails or times out
    pub fn not_ready() -> Self {
        Self::new(0, 0.0, false)
    }

    /// Clamp service output into the ranges the engine relies on.
    ///
    /// `ready` is trusted as given.
    pub fn sanitized(mut self, max_fiducials: u8) -> Self {
        self.detected_count = self.detected_count.min(max_fiducials);
        self.quality = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

impl Default for FiducialResult {
    fn default() -> Self {
        Self::not_ready()
    }
}

/// Arming state machine over one camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmState {
    Idle,
    Arming,
    Firing,
}

impl fmt::Display for ArmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmState::Idle => write!(f, "idle"),
            ArmState::Arming => write!(f, "arming"),
            ArmState::Firing => write!(f, "firing"),
        }
    }
}

/// State change produced by one engine input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Arming, countdown started
    Armed,
    /// Arming -> Idle before the countdown elapsed
    Cancelled,
    /// Arming -> Firing; the caller must trigger exactly one capture
    Fire,
}

/// What started a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureTrigger {
    Auto,
    Manual,
}

/// Image returned by the capture actuator
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
    pub trigger: CaptureTrigger,
}

impl CapturedImage {
    pub fn new(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            captured_at: Utc::now(),
            trigger: CaptureTrigger::Auto,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Point-in-time view of the readiness state, recomputed on every input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSnapshot {
    pub alignment_score: f32,
    pub fiducial_count: u8,
    pub fiducial_quality: f32,
    pub fiducial_ready: bool,
    pub state: ArmState,
    pub remaining_ms: u64,
    pub locked: bool,
    pub arming_enabled: bool,
    pub camera_ready: bool,
    pub motion_available: bool,
    pub status_message: String,
    pub last_error: Option<String>,
}
