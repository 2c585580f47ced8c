use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::capture::{
    CaptureArtifact, CaptureFault, CaptureSession, DeviceActivity, DeviceEvent, PlaybackEvent, PlaybackTicket,
};
use crate::models::error::AssessmentError;
use crate::models::prompt::{AudioRef, PromptId};
use crate::models::state::CaptureStatus;
use crate::traits::audio_device::{AudioDevice, CaptureFaultCallback, PlaybackCallback};

struct ActiveCapture {
    session: CaptureSession,
    started: Instant,
}

enum Activity {
    Idle,
    Recording(ActiveCapture),
    Playing(PlaybackTicket),
}

/// Internal mutable controller state, protected by `parking_lot::Mutex`.
struct ControllerInner<D> {
    device: D,
    permission: Option<bool>,
    activity: Activity,
}

/// Sole owner of the recording/playback device.
///
/// Clones are handles to the same device: at most one recording or playback
/// is active across all of them, and a second start is rejected with
/// `DeviceBusy` rather than queued.
///
/// Playback completion and recording faults arrive on the backend's thread.
/// The controller only queues them as [`DeviceEvent`]s; the owner of the
/// round drains the queue and feeds each event back in, so every state change
/// happens on the caller's thread.
pub struct CaptureController<D: AudioDevice> {
    inner: Arc<Mutex<ControllerInner<D>>>,
    events_tx: Sender<DeviceEvent>,
    events_rx: Arc<Mutex<Receiver<DeviceEvent>>>,
}

impl<D: AudioDevice> Clone for CaptureController<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            events_tx: self.events_tx.clone(),
            events_rx: Arc::clone(&self.events_rx),
        }
    }
}

impl<D: AudioDevice> CaptureController<D> {
    pub fn new(device: D) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                device,
                permission: None,
                activity: Activity::Idle,
            })),
            events_tx,
            events_rx: Arc::new(Mutex::new(events_rx)),
        }
    }

    /// Query the backend for microphone permission and remember the answer.
    pub fn request_permission(&self) -> Result<bool, AssessmentError> {
        let mut inner = self.inner.lock();
        let granted = inner
            .device
            .request_permission()
            .map_err(AssessmentError::into_device_error)?;
        if !granted {
            log::warn!("Microphone permission denied");
        }
        inner.permission = Some(granted);
        Ok(granted)
    }

    /// Last permission answer, if permission was ever requested.
    pub fn permission(&self) -> Option<bool> {
        self.inner.lock().permission
    }

    pub fn activity(&self) -> DeviceActivity {
        match &self.inner.lock().activity {
            Activity::Idle => DeviceActivity::Idle,
            Activity::Recording(active) => DeviceActivity::Recording {
                session_id: active.session.id,
            },
            Activity::Playing(ticket) => DeviceActivity::Playing { ticket: *ticket },
        }
    }

    /// Start recording the response to `prompt`. Transitions: idle → preparing → recording.
    pub fn start_capture(&self, prompt: &PromptId, round_index: usize) -> Result<CaptureSession, AssessmentError> {
        let mut inner = self.inner.lock();

        if !matches!(inner.activity, Activity::Idle) {
            return Err(AssessmentError::DeviceBusy);
        }
        if inner.permission != Some(true) {
            return Err(AssessmentError::PermissionDenied);
        }

        let mut session = CaptureSession {
            id: Uuid::new_v4(),
            prompt_id: prompt.clone(),
            round_index,
            started_at: Utc::now(),
            status: CaptureStatus::Preparing,
        };

        let events = self.events_tx.clone();
        let session_id = session.id;
        let on_fault: CaptureFaultCallback = Arc::new(move |message| {
            let fault = CaptureFault { session_id, message };
            if events.send(DeviceEvent::CaptureFault(fault)).is_err() {
                log::debug!("Recording fault after controller was dropped");
            }
        });

        if let Err(e) = inner.device.start_recording(prompt, on_fault) {
            log::warn!("Failed to start recording for {}: {}", prompt, e);
            inner.device.release();
            return Err(e.into_device_error());
        }

        session.status = CaptureStatus::Recording;
        inner.activity = Activity::Recording(ActiveCapture {
            session: session.clone(),
            started: Instant::now(),
        });
        log::debug!("Recording {} for prompt {}", session.id, prompt);
        Ok(session)
    }

    /// Stop `session` and return its artifact.
    ///
    /// The device is released whether or not the backend stops cleanly.
    pub fn stop_capture(&self, session: &CaptureSession) -> Result<CaptureArtifact, AssessmentError> {
        let mut inner = self.inner.lock();

        let active = match mem::replace(&mut inner.activity, Activity::Idle) {
            Activity::Recording(active) if active.session.id == session.id => active,
            other => {
                inner.activity = other;
                return Err(AssessmentError::NoActiveCapture);
            }
        };

        let stopped = inner.device.stop_recording();
        inner.device.release();

        let recorded = stopped.map_err(|e| {
            log::warn!("Failed to stop recording {}: {}", active.session.id, e);
            e.into_device_error()
        })?;

        let duration = recorded.duration.unwrap_or_else(|| active.started.elapsed());
        log::debug!(
            "Recording {} stopped after {:.1}s",
            active.session.id,
            duration.as_secs_f64()
        );

        Ok(CaptureArtifact {
            id: active.session.id,
            prompt_id: active.session.prompt_id,
            round_index: active.session.round_index,
            location: recorded.location,
            duration_ms: duration.as_millis() as u64,
            recorded_at: active.session.started_at,
            checksum: recorded.checksum,
        })
    }

    /// Start playing a prompt clip. Completion is queued as a [`DeviceEvent::Playback`].
    pub fn play_prompt(&self, clip: &AudioRef) -> Result<PlaybackTicket, AssessmentError> {
        let mut inner = self.inner.lock();

        if !matches!(inner.activity, Activity::Idle) {
            return Err(AssessmentError::DeviceBusy);
        }

        let ticket = PlaybackTicket::new();
        let events = self.events_tx.clone();
        let on_finished: PlaybackCallback = Arc::new(move |outcome| {
            if events.send(DeviceEvent::Playback(PlaybackEvent { ticket, outcome })).is_err() {
                log::debug!("Playback finished after controller was dropped");
            }
        });

        if let Err(e) = inner.device.start_playback(clip, on_finished) {
            log::warn!("Failed to play {}: {}", clip.location.display(), e);
            inner.device.release();
            return Err(e.into_device_error());
        }

        inner.activity = Activity::Playing(ticket);
        log::debug!("Playing {}", clip.location.display());
        Ok(ticket)
    }

    /// Mark a playback as ended and release the device.
    ///
    /// Returns false if `ticket` is not the active playback.
    pub fn finish_playback(&self, ticket: PlaybackTicket) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.activity, Activity::Playing(active) if active == ticket) {
            return false;
        }
        inner.activity = Activity::Idle;
        inner.device.release();
        true
    }

    /// Abort `session`, discarding its audio. Returns false if it is not recording.
    pub fn cancel_capture(&self, session: &CaptureSession) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(&inner.activity, Activity::Recording(active) if active.session.id == session.id) {
            return false;
        }
        Self::abort(&mut inner);
        true
    }

    /// Abort the playback identified by `ticket`. Returns false if it is not playing.
    pub fn cancel_playback(&self, ticket: PlaybackTicket) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.activity, Activity::Playing(active) if active == ticket) {
            return false;
        }
        Self::abort(&mut inner);
        true
    }

    /// Abort whatever is active. Safe to call repeatedly; only the first call
    /// with something active touches the device.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if matches!(inner.activity, Activity::Idle) {
            return false;
        }
        Self::abort(&mut inner);
        true
    }

    /// Next queued device event, without blocking.
    pub fn try_device_event(&self) -> Option<DeviceEvent> {
        self.events_rx.lock().try_recv().ok()
    }

    /// Wait up to `timeout` for the next device event.
    pub fn wait_device_event(&self, timeout: Duration) -> Option<DeviceEvent> {
        match self.events_rx.lock().recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            // The controller holds a sender, so the channel cannot disconnect.
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn abort(inner: &mut ControllerInner<D>) {
        match mem::replace(&mut inner.activity, Activity::Idle) {
            Activity::Recording(active) => {
                if let Err(e) = inner.device.discard_recording() {
                    log::error!("Failed to discard recording {}: {}", active.session.id, e);
                }
                log::info!("Recording {} cancelled", active.session.id);
            }
            Activity::Playing(_) => {
                if let Err(e) = inner.device.stop_playback() {
                    log::error!("Failed to stop playback: {}", e);
                }
                log::info!("Playback cancelled");
            }
            Activity::Idle => return,
        }
        inner.device.release();
    }
}
