//! Camera session actor
//!
//! One tokio task owns the [`ReadinessEngine`] for the lifetime of a camera
//! session. Motion samples, marker-check completions, countdown ticks,
//! capture completions and caller commands all arrive over channels and are
//! applied one at a time, so the engine never sees concurrent writers.
//! Snapshots are published on a `watch` channel after every input.

use crate::config::ReadinessConfig;
use crate::engine::ReadinessEngine;
use crate::errors::CaptureError;
use crate::interfaces::{CaptureActuator, MarkerDetector, MotionSensor};
use crate::types::{
    CaptureTrigger, CapturedImage, FiducialResult, MotionSample, ReadinessSnapshot, Transition,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

/// Notifications for the UI layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Armed,
    ArmingCancelled,
    CaptureTriggered(CaptureTrigger),
    Captured(CapturedImage),
    /// User-visible capture failure; the engine is unlocked again
    CaptureFailed(String),
}

enum Command {
    SetArmingEnabled(bool),
    CaptureNow(oneshot::Sender<Result<(), CaptureError>>),
    Rearm,
    Close(oneshot::Sender<()>),
}

type CaptureOutcome = (CaptureTrigger, Result<CapturedImage, CaptureError>);

/// Handle to a running camera session
pub struct CaptureSession {
    id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
    motion: mpsc::UnboundedSender<MotionSample>,
    snapshots: watch::Receiver<ReadinessSnapshot>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Start a fresh session. Must be called from within a tokio runtime.
    ///
    /// With `sensor` set, the session polls it at the configured sample
    /// period; otherwise samples can be pushed with [`push_motion`].
    ///
    /// [`push_motion`]: CaptureSession::push_motion
    pub fn open(
        config: ReadinessConfig,
        actuator: Arc<dyn CaptureActuator>,
        detector: Arc<dyn MarkerDetector>,
        sensor: Option<Box<dyn MotionSensor>>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigError)?;

        let id = Uuid::new_v4();
        let mut engine = ReadinessEngine::new(&config);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (motion_tx, motion_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (check_tx, check_rx) = mpsc::unbounded_channel();
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();

        let motion_task = match sensor {
            Some(sensor) if sensor.is_available() => Some(tokio::spawn(motion_feed(
                sensor,
                config.motion.sample_period(),
                motion_tx.clone(),
            ))),
            Some(_) => {
                engine.set_motion_available(false);
                None
            }
            None => None,
        };

        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let mut poll = tokio::time::interval(config.fiducial.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut countdown = tokio::time::interval(config.arming.countdown_tick());
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let actor = SessionActor {
            id,
            request_timeout_ms: config.fiducial.request_timeout_ms,
            engine,
            actuator,
            detector,
            commands: command_rx,
            motion_rx,
            check_tx,
            check_rx,
            capture_tx,
            capture_rx,
            snapshot_tx,
            event_tx,
            poll,
            countdown,
            check_task: None,
            capture_task: None,
            motion_task,
        };

        log::info!("Opened capture session {}", id);
        let task = tokio::spawn(actor.run());

        Ok(Self {
            id,
            commands: command_tx,
            motion: motion_tx,
            snapshots: snapshot_rx,
            events: event_rx,
            task: Some(task),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Feed a motion sample from an external listener
    pub fn push_motion(&self, sample: MotionSample) -> Result<(), CaptureError> {
        self.motion
            .send(sample)
            .map_err(|_| CaptureError::SessionClosed)
    }

    /// User-facing auto-capture toggle
    pub fn set_arming_enabled(&self, enabled: bool) -> Result<(), CaptureError> {
        self.send(Command::SetArmingEnabled(enabled))
    }

    /// Capture immediately, bypassing the arming countdown.
    ///
    /// Fails with `CameraNotReady` when the camera is not usable or a capture
    /// is already in flight. The image arrives as [`SessionEvent::Captured`].
    pub async fn capture_now(&self) -> Result<(), CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::CaptureNow(tx))?;
        rx.await.map_err(|_| CaptureError::SessionClosed)?
    }

    /// Unlock after a completed capture so auto capture can arm again.
    ///
    /// Ignored while a capture is still in flight or nothing is locked.
    pub fn rearm(&self) -> Result<(), CaptureError> {
        self.send(Command::Rearm)
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.snapshots.clone()
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the motion listener, drop any pending countdown, marker check or
    /// capture, and reset all readiness state. Returns the final snapshot.
    pub async fn close(mut self) -> Result<ReadinessSnapshot, CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await.map_err(|_| CaptureError::SessionClosed)?;

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::warn!("Session {} task ended abnormally: {}", self.id, e);
            }
        }
        Ok(self.snapshot())
    }

    fn send(&self, command: Command) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .map_err(|_| CaptureError::SessionClosed)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            log::debug!("Capture session {} dropped without close", self.id);
            task.abort();
        }
    }
}

struct SessionActor {
    id: Uuid,
    request_timeout_ms: u64,
    engine: ReadinessEngine,
    actuator: Arc<dyn CaptureActuator>,
    detector: Arc<dyn MarkerDetector>,
    commands: mpsc::UnboundedReceiver<Command>,
    motion_rx: mpsc::UnboundedReceiver<MotionSample>,
    check_tx: mpsc::UnboundedSender<FiducialResult>,
    check_rx: mpsc::UnboundedReceiver<FiducialResult>,
    capture_tx: mpsc::UnboundedSender<CaptureOutcome>,
    capture_rx: mpsc::UnboundedReceiver<CaptureOutcome>,
    snapshot_tx: watch::Sender<ReadinessSnapshot>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    poll: Interval,
    countdown: Interval,
    check_task: Option<JoinHandle<()>>,
    capture_task: Option<JoinHandle<()>>,
    motion_task: Option<JoinHandle<()>>,
}

impl Drop for SessionActor {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Close(ack)) => {
                        self.shutdown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some(sample) = self.motion_rx.recv() => {
                    let transition = self.engine.on_motion_sample(sample, Instant::now());
                    self.apply(transition);
                }
                Some(result) = self.check_rx.recv() => {
                    self.check_task = None;
                    let transition = self.engine.on_fiducial_result(result, Instant::now());
                    self.apply(transition);
                }
                Some((trigger, outcome)) = self.capture_rx.recv() => {
                    self.capture_task = None;
                    self.finish_capture(trigger, outcome);
                }
                _ = self.poll.tick() => {
                    self.sync_camera_ready();
                    self.maybe_start_check();
                }
                _ = self.countdown.tick(), if self.engine.is_arming() => {
                    self.sync_camera_ready();
                    let transition = self.engine.tick(Instant::now());
                    self.apply(transition);
                }
            }
            self.publish();
        }
        log::info!("Closed capture session {}", self.id);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetArmingEnabled(enabled) => {
                log::debug!("Auto capture {}", if enabled { "enabled" } else { "disabled" });
                let transition = self.engine.set_arming_enabled(enabled, Instant::now());
                self.apply(transition);
            }
            Command::CaptureNow(reply) => {
                self.sync_camera_ready();
                match self.engine.begin_manual_capture(Instant::now()) {
                    Ok(transition) => {
                        self.apply(transition);
                        self.start_capture(CaptureTrigger::Manual);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        log::debug!("Manual capture refused: {}", e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Rearm => {
                if self.capture_task.is_some() {
                    log::warn!("Ignoring re-arm while a capture is in flight");
                } else {
                    self.engine.rearm();
                }
            }
            Command::Close(_) => unreachable!("close is handled by the run loop"),
        }
    }

    fn apply(&mut self, transition: Option<Transition>) {
        match transition {
            Some(Transition::Armed) => {
                self.countdown.reset();
                self.emit(SessionEvent::Armed);
            }
            Some(Transition::Cancelled) => self.emit(SessionEvent::ArmingCancelled),
            Some(Transition::Fire) => self.start_capture(CaptureTrigger::Auto),
            None => {}
        }
    }

    fn sync_camera_ready(&mut self) {
        let ready = self.actuator.is_ready();
        if ready != self.engine.is_camera_ready() {
            log::debug!("Camera ready: {}", ready);
            let transition = self.engine.set_camera_ready(ready, Instant::now());
            self.apply(transition);
        }
    }

    fn maybe_start_check(&mut self) {
        if self.check_task.is_some() {
            log::trace!("Marker check still in flight, skipping tick");
            return;
        }
        if !self.engine.should_poll_fiducials() {
            return;
        }

        let actuator = self.actuator.clone();
        let detector = self.detector.clone();
        let tx = self.check_tx.clone();
        let timeout_ms = self.request_timeout_ms;
        self.check_task = Some(tokio::spawn(async move {
            let result = run_marker_check(actuator, detector, timeout_ms).await;
            let _ = tx.send(result);
        }));
    }

    fn start_capture(&mut self, trigger: CaptureTrigger) {
        log::info!("Triggering {:?} capture", trigger);
        self.emit(SessionEvent::CaptureTriggered(trigger));

        let actuator = self.actuator.clone();
        let tx = self.capture_tx.clone();
        self.capture_task = Some(tokio::spawn(async move {
            let outcome = actuator.request_capture().await;
            let _ = tx.send((trigger, outcome));
        }));
    }

    fn finish_capture(&mut self, trigger: CaptureTrigger, outcome: Result<CapturedImage, CaptureError>) {
        match outcome {
            Ok(mut image) => {
                image.trigger = trigger;
                log::info!(
                    "Captured {}x{} image ({} bytes)",
                    image.width,
                    image.height,
                    image.size_bytes()
                );
                self.engine.capture_succeeded();
                self.emit(SessionEvent::Captured(image));
            }
            Err(e) => {
                let message = e.to_string();
                self.engine.capture_failed(message.clone());
                self.emit(SessionEvent::CaptureFailed(message));
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            log::trace!("Session {} has no event listener", self.id);
        }
    }

    fn publish(&self) {
        let snapshot = self.engine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }

    fn abort_tasks(&mut self) {
        for task in [
            self.motion_task.take(),
            self.check_task.take(),
            self.capture_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }

    fn shutdown(&mut self) {
        self.abort_tasks();
        // Drop results that completed but were not yet applied
        while self.check_rx.try_recv().is_ok() {}
        while self.capture_rx.try_recv().is_ok() {}
        self.engine.reset();
        self.publish();
    }
}

/// Grab a still and run it through the detector within `timeout_ms`.
///
/// Failures never escape: they are logged and become the not-ready sentinel.
async fn run_marker_check(
    actuator: Arc<dyn CaptureActuator>,
    detector: Arc<dyn MarkerDetector>,
    timeout_ms: u64,
) -> FiducialResult {
    let check = async {
        let still = actuator.grab_still().await?;
        detector.detect(still).await
    };

    match tokio::time::timeout(Duration::from_millis(timeout_ms), check).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            log::warn!("Marker check failed: {}", e);
            FiducialResult::not_ready()
        }
        Err(_) => {
            log::warn!("{}", CaptureError::DetectionTimeout(timeout_ms));
            FiducialResult::not_ready()
        }
    }
}

async fn motion_feed(
    mut sensor: Box<dyn MotionSensor>,
    period: Duration,
    tx: mpsc::UnboundedSender<MotionSample>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failures = 0u32;

    loop {
        interval.tick().await;
        match sensor.read() {
            Ok(sample) => {
                failures = 0;
                if tx.send(sample).is_err() {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                if failures == 1 {
                    log::warn!("Motion sensor read failed: {}", e);
                } else {
                    log::debug!("Motion sensor read failed ({} in a row): {}", failures, e);
                }
            }
        }
    }
}
