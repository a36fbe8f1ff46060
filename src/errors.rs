use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Camera not ready: {0}")]
    CameraNotReady(String),
    #[error("Capture error: {0}")]
    CaptureFailed(String),
    #[error("Invalid motion sample: {0}")]
    InvalidMotionSample(String),
    #[error("Motion sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("Marker detection error: {0}")]
    DetectionError(String),
    #[error("Marker detection timed out after {0} ms")]
    DetectionTimeout(u64),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Capture session is closed")]
    SessionClosed,
}

impl From<image::ImageError> for CaptureError {
    fn from(e: image::ImageError) -> Self {
        CaptureError::ImageError(e.to_string())
    }
}

impl From<reqwest::Error> for CaptureError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CaptureError::DetectionError(format!("request timed out: {}", e))
        } else {
            CaptureError::DetectionError(e.to_string())
        }
    }
}
