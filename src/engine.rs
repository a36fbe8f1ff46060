//! Capture readiness engine
//!
//! Single-writer reducer over all readiness state: the smoothed alignment
//! score, the latest marker check, the external toggles and the
//! `Idle -> Arming -> Firing` state machine. Every input updates its fields
//! first and then re-evaluates the arm condition, returning at most one
//! [`Transition`]. Time is passed in so the reducer stays deterministic; the
//! session actor feeds it `Instant::now()`.

use crate::config::{AlignmentConfig, ArmingConfig, ReadinessConfig};
use crate::errors::CaptureError;
use crate::quality::{status_message, AlignmentTracker};
use crate::timing::Countdown;
use crate::types::{
    ArmState, FiducialResult, MotionSample, ReadinessSnapshot, Transition, MAX_FIDUCIALS,
};
use tokio::time::Instant;

/// Per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub motion_samples: u64,
    pub rejected_samples: u64,
    pub fiducial_results: u64,
    pub armed: u64,
    pub cancelled: u64,
    pub fired: u64,
}

#[derive(Debug, Clone)]
pub struct ReadinessEngine {
    alignment_cfg: AlignmentConfig,
    arming_cfg: ArmingConfig,
    tracker: AlignmentTracker,
    fiducial: FiducialResult,
    state: ArmState,
    countdown: Option<Countdown>,
    remaining_ms: u64,
    locked: bool,
    arming_enabled: bool,
    camera_ready: bool,
    motion_available: bool,
    status: String,
    last_error: Option<String>,
    stats: EngineStats,
}

impl ReadinessEngine {
    pub fn new(config: &ReadinessConfig) -> Self {
        let mut engine = Self {
            alignment_cfg: config.alignment.clone(),
            arming_cfg: config.arming.clone(),
            tracker: AlignmentTracker::new(config.alignment.max_accel_delta),
            fiducial: FiducialResult::not_ready(),
            state: ArmState::Idle,
            countdown: None,
            remaining_ms: 0,
            locked: false,
            arming_enabled: config.arming.auto_capture_enabled,
            camera_ready: false,
            motion_available: true,
            status: String::new(),
            last_error: None,
            stats: EngineStats::default(),
        };
        engine.refresh_status();
        engine
    }

    /// Fold a motion sample into the alignment score.
    ///
    /// Non-finite samples are dropped before they reach the score.
    pub fn on_motion_sample(&mut self, sample: MotionSample, now: Instant) -> Option<Transition> {
        match self.tracker.update(sample) {
            Ok(metrics) => {
                self.stats.motion_samples += 1;
                log::trace!(
                    "motion sample composite={:.3} jitter={:.3} score={:.3}",
                    metrics.composite,
                    metrics.jitter_penalty,
                    self.tracker.score()
                );
            }
            Err(e) => {
                self.stats.rejected_samples += 1;
                log::warn!("Skipping motion sample: {}", e);
                return None;
            }
        }
        self.refresh_status();
        self.evaluate(now)
    }

    /// Apply a completed marker check, then re-evaluate
    pub fn on_fiducial_result(&mut self, result: FiducialResult, now: Instant) -> Option<Transition> {
        self.fiducial = result.sanitized(MAX_FIDUCIALS);
        self.stats.fiducial_results += 1;
        log::debug!(
            "fiducial result detected={} quality={:.2} ready={}",
            self.fiducial.detected_count,
            self.fiducial.quality,
            self.fiducial.ready
        );
        self.refresh_status();
        self.evaluate(now)
    }

    /// User-facing auto-capture toggle
    pub fn set_arming_enabled(&mut self, enabled: bool, now: Instant) -> Option<Transition> {
        self.arming_enabled = enabled;
        self.evaluate(now)
    }

    /// Capture actuator focused and usable
    pub fn set_camera_ready(&mut self, ready: bool, now: Instant) -> Option<Transition> {
        self.camera_ready = ready;
        self.evaluate(now)
    }

    /// Without a motion sensor the score stays where it is and only manual
    /// capture remains useful.
    pub fn set_motion_available(&mut self, available: bool) {
        if !available && self.motion_available {
            log::warn!("Motion sensor unavailable, auto capture limited to manual mode");
        }
        self.motion_available = available;
    }

    /// Countdown refresh; fires once the arming duration has elapsed
    pub fn tick(&mut self, now: Instant) -> Option<Transition> {
        self.evaluate(now)
    }

    /// Lock the engine for a user-initiated capture.
    ///
    /// Cancels an arm cycle in progress.
    pub fn begin_manual_capture(&mut self, now: Instant) -> Result<Option<Transition>, CaptureError> {
        if !self.camera_ready {
            return Err(CaptureError::CameraNotReady(
                "camera is not focused yet".to_string(),
            ));
        }
        if self.locked {
            return Err(CaptureError::CameraNotReady(
                "a capture is already in progress".to_string(),
            ));
        }

        let transition = if self.state == ArmState::Arming {
            self.cancel_arming(now);
            Some(Transition::Cancelled)
        } else {
            None
        };
        self.locked = true;
        self.last_error = None;
        Ok(transition)
    }

    /// Capture finished; the engine stays locked until `rearm` or `reset`
    pub fn capture_succeeded(&mut self) {
        self.last_error = None;
        log::info!("Capture completed, engine locked until re-armed");
    }

    /// Capture actuator failed: unlock, return to idle and keep the message
    /// for display.
    pub fn capture_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("Capture failed: {}", message);
        self.unlock_to_idle();
        self.last_error = Some(message);
    }

    /// Release the lock after a completed capture.
    ///
    /// Ignored unless the engine is locked; returns whether it unlocked.
    pub fn rearm(&mut self) -> bool {
        if !self.locked {
            log::debug!("Ignoring re-arm in state {}: engine is not locked", self.state);
            return false;
        }
        self.unlock_to_idle();
        self.last_error = None;
        log::debug!("Engine re-armed");
        true
    }

    /// Back to the initial state of a fresh camera session
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.fiducial = FiducialResult::not_ready();
        self.state = ArmState::Idle;
        self.countdown = None;
        self.remaining_ms = 0;
        self.locked = false;
        self.arming_enabled = self.arming_cfg.auto_capture_enabled;
        self.camera_ready = false;
        self.motion_available = true;
        self.last_error = None;
        self.stats = EngineStats::default();
        self.refresh_status();
    }

    /// A marker check may start: camera usable and nothing in flight
    pub fn should_poll_fiducials(&self) -> bool {
        self.camera_ready && !self.locked
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn alignment_score(&self) -> f32 {
        self.tracker.score()
    }

    pub fn fiducial(&self) -> &FiducialResult {
        &self.fiducial
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_camera_ready(&self) -> bool {
        self.camera_ready
    }

    pub fn is_arming(&self) -> bool {
        self.state == ArmState::Arming
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            alignment_score: self.tracker.score(),
            fiducial_count: self.fiducial.detected_count,
            fiducial_quality: self.fiducial.quality,
            fiducial_ready: self.fiducial.ready,
            state: self.state,
            remaining_ms: self.remaining_ms,
            locked: self.locked,
            arming_enabled: self.arming_enabled,
            camera_ready: self.camera_ready,
            motion_available: self.motion_available,
            status_message: self.status.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn fiducials_hold(&self) -> bool {
        self.fiducial.detected_count >= self.arming_cfg.min_fiducials && self.fiducial.ready
    }

    fn can_arm(&self) -> bool {
        self.camera_ready
            && self.arming_enabled
            && !self.locked
            && self.fiducials_hold()
            && self.tracker.score() >= self.alignment_cfg.start_threshold
    }

    /// Condition checked while arming. Defaults to the entry condition; the
    /// lower cancel band only applies with `use_cancel_hysteresis`.
    fn arming_holds(&self) -> bool {
        if !self.alignment_cfg.use_cancel_hysteresis {
            return self.can_arm();
        }
        self.camera_ready
            && self.arming_enabled
            && !self.locked
            && self.fiducials_hold()
            && self.tracker.score() >= self.alignment_cfg.cancel_threshold
    }

    fn evaluate(&mut self, now: Instant) -> Option<Transition> {
        match self.state {
            ArmState::Idle => {
                if !self.can_arm() {
                    return None;
                }
                let countdown = Countdown::start(now, self.arming_cfg.arming_duration());
                self.remaining_ms = countdown.remaining_ms(now);
                self.countdown = Some(countdown);
                self.state = ArmState::Arming;
                self.stats.armed += 1;
                log::info!(
                    "Auto capture arming: score={:.2} corners={} quality={:.2}",
                    self.tracker.score(),
                    self.fiducial.detected_count,
                    self.fiducial.quality
                );
                Some(Transition::Armed)
            }
            ArmState::Arming => {
                if !self.arming_holds() {
                    self.cancel_arming(now);
                    return Some(Transition::Cancelled);
                }
                let countdown = self.countdown?;
                if countdown.is_expired(now) {
                    self.state = ArmState::Firing;
                    self.locked = true;
                    self.countdown = None;
                    self.remaining_ms = 0;
                    self.stats.fired += 1;
                    log::info!("Auto capture firing after {:?}", countdown.elapsed(now));
                    Some(Transition::Fire)
                } else {
                    self.remaining_ms = countdown.remaining_ms(now);
                    None
                }
            }
            ArmState::Firing => None,
        }
    }

    fn cancel_arming(&mut self, now: Instant) {
        if let Some(countdown) = self.countdown.take() {
            log::info!(
                "Auto capture cancelled after {:?}: score={:.2} corners={} ready={}",
                countdown.elapsed(now),
                self.tracker.score(),
                self.fiducial.detected_count,
                self.fiducial.ready
            );
        }
        self.state = ArmState::Idle;
        self.remaining_ms = 0;
        self.stats.cancelled += 1;
    }

    fn unlock_to_idle(&mut self) {
        self.locked = false;
        self.state = ArmState::Idle;
        self.countdown = None;
        self.remaining_ms = 0;
    }

    fn refresh_status(&mut self) {
        self.status = status_message(
            self.fiducial.detected_count,
            self.arming_cfg.min_fiducials,
            self.fiducial.ready,
            self.fiducial.quality,
            self.tracker.score(),
            self.alignment_cfg.start_threshold,
        );
    }
}
