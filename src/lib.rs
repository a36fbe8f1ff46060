//! AquaCapture: auto-capture readiness for water-quality sample-card photography
//!
//! Decides when the camera should automatically photograph a test card.
//! Two signals are fused: device alignment from the accelerometer, and
//! corner-marker detection from periodic stills sent to a detection service.
//! When both hold, a short countdown runs and the capture fires once.
//!
//! # Features
//! - Smoothed alignment score with jitter penalty
//! - `Idle -> Arming -> Firing` state machine with single-fire lock
//! - Throttled marker checks against an HTTP detection service
//! - Status line for the capture UI
//! - Manual capture fallback when the motion sensor is missing
//!
//! # Usage
//! ```rust,ignore
//! use aquacapture::{CaptureSession, HttpMarkerDetector, ReadinessConfig};
//! use std::sync::Arc;
//!
//! let config = ReadinessConfig::load_or_default();
//! let detector = Arc::new(HttpMarkerDetector::new(&config.fiducial)?);
//! let mut session = CaptureSession::open(config, camera, detector, Some(sensor))?;
//! while let Some(event) = session.next_event().await {
//!     println!("{:?}", event);
//! }
//! ```
pub mod config;
pub mod detector;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod quality;
pub mod session;
pub mod timing;
pub mod types;

// Testing utilities - scripted collaborators and synthetic data
pub mod testing;

// Re-exports for convenience
pub use config::ReadinessConfig;
pub use detector::HttpMarkerDetector;
pub use engine::{EngineStats, ReadinessEngine};
pub use errors::CaptureError;
pub use interfaces::{CaptureActuator, MarkerDetector, MotionSensor};
pub use session::{CaptureSession, SessionEvent};
pub use types::{
    ArmState, CaptureTrigger, CapturedImage, CornerLabel, CornerMarker, FiducialResult,
    MotionSample, ReadinessSnapshot, Transition,
};

/// Initialize logging for the capture engine
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "aquacapture=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
