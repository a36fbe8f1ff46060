//! Testing utilities for aquacapture
//!
//! Synthetic motion streams and stills, plus scripted collaborators, so the
//! engine and session can be exercised without a phone, a camera or the
//! detection service.

pub mod mocks;
pub mod synthetic_data;

pub use mocks::{MockActuator, ScriptedDetector, ScriptedSensor};
pub use synthetic_data::{level_samples, shaking_samples, synthetic_card_still, tilted_sample};
