//! Scripted collaborators for offline tests and simulations.

use crate::errors::CaptureError;
use crate::interfaces::{CaptureActuator, MarkerDetector, MotionSensor};
use crate::testing::synthetic_data::synthetic_card_still;
use crate::types::{CapturedImage, FiducialResult, MotionSample};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Detector that replays queued responses, then keeps answering with a
/// fallback result.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Result<FiducialResult, String>>>,
    fallback: Mutex<FiducialResult>,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(fallback: FiducialResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call answers "all four corners, ready"
    pub fn always_ready() -> Self {
        Self::new(FiducialResult::new(4, 0.9, true))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_ok(&self, result: FiducialResult) {
        self.script.lock().expect("lock poisoned").push_back(Ok(result));
    }

    pub fn push_err(&self, message: impl Into<String>) {
        self.script
            .lock()
            .expect("lock poisoned")
            .push_back(Err(message.into()));
    }

    pub fn set_fallback(&self, result: FiducialResult) {
        *self.fallback.lock().expect("lock poisoned") = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarkerDetector for ScriptedDetector {
    async fn detect(&self, _still: Bytes) -> Result<FiducialResult, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().expect("lock poisoned").pop_front();
        match next {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(CaptureError::DetectionError(message)),
            None => Ok(self.fallback.lock().expect("lock poisoned").clone()),
        }
    }
}

/// Camera stand-in that counts captures and can be told to fail
pub struct MockActuator {
    ready: AtomicBool,
    fail_next: Mutex<Option<String>>,
    capture_latency: Duration,
    captures: AtomicUsize,
    stills: AtomicUsize,
    still: Bytes,
}

impl MockActuator {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            fail_next: Mutex::new(None),
            capture_latency: Duration::ZERO,
            captures: AtomicUsize::new(0),
            stills: AtomicUsize::new(0),
            still: synthetic_card_still(216, 248),
        }
    }

    pub fn with_capture_latency(mut self, latency: Duration) -> Self {
        self.capture_latency = latency;
        self
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// The next `request_capture` fails with `message`
    pub fn fail_next_capture(&self, message: impl Into<String>) {
        *self.fail_next.lock().expect("lock poisoned") = Some(message.into());
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn stills(&self) -> usize {
        self.stills.load(Ordering::SeqCst)
    }
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureActuator for MockActuator {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn grab_still(&self) -> Result<Bytes, CaptureError> {
        self.stills.fetch_add(1, Ordering::SeqCst);
        Ok(self.still.clone())
    }

    async fn request_capture(&self) -> Result<CapturedImage, CaptureError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if !self.capture_latency.is_zero() {
            tokio::time::sleep(self.capture_latency).await;
        }
        if let Some(message) = self.fail_next.lock().expect("lock poisoned").take() {
            return Err(CaptureError::CaptureFailed(message));
        }
        Ok(CapturedImage::new(self.still.clone(), 216, 248))
    }
}

/// Motion sensor that replays a sample list, repeating the last one
pub struct ScriptedSensor {
    available: bool,
    samples: VecDeque<MotionSample>,
    last: MotionSample,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSensor {
    pub fn new(samples: Vec<MotionSample>) -> Self {
        Self {
            available: true,
            samples: samples.into(),
            last: MotionSample::level(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    /// Shared read counter, still readable after the sensor moves into a session
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

impl MotionSensor for ScriptedSensor {
    fn is_available(&self) -> bool {
        self.available
    }

    fn read(&mut self) -> Result<MotionSample, CaptureError> {
        if !self.available {
            return Err(CaptureError::SensorUnavailable(
                "scripted sensor is disabled".to_string(),
            ));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(sample) = self.samples.pop_front() {
            self.last = sample;
        }
        Ok(self.last)
    }
}
