//! Collaborator contracts consumed by the capture session.

use crate::errors::CaptureError;
use crate::types::{CapturedImage, FiducialResult, MotionSample};
use async_trait::async_trait;
use bytes::Bytes;

/// Accelerometer source, polled at the configured sample period
pub trait MotionSensor: Send + 'static {
    /// `false` puts the session into manual-capture-only mode
    fn is_available(&self) -> bool;

    fn read(&mut self) -> Result<MotionSample, CaptureError>;
}

/// Remote corner-marker detection
#[async_trait]
pub trait MarkerDetector: Send + Sync {
    /// Detect markers in one JPEG still
    async fn detect(&self, still: Bytes) -> Result<FiducialResult, CaptureError>;
}

/// Physical camera
#[async_trait]
pub trait CaptureActuator: Send + Sync {
    /// Focused and usable
    fn is_ready(&self) -> bool;

    /// Low-quality JPEG still used for marker detection
    async fn grab_still(&self) -> Result<Bytes, CaptureError>;

    /// Full capture of the sample card
    async fn request_capture(&self) -> Result<CapturedImage, CaptureError>;
}
