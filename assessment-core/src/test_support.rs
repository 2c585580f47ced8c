//! Scriptable fakes shared by the unit tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::capture::{CaptureArtifact, PlaybackOutcome, RecordedAudio};
use crate::models::error::AssessmentError;
use crate::models::prompt::{AudioRef, Prompt, PromptId, PromptSet};
use crate::models::result::{CefrLevel, ResultSummary, RoundScore};
use crate::models::round::{RoundKind, RoundRecord};
use crate::models::session::SessionRecord;
use crate::models::state::RoundState;
use crate::traits::assessment_delegate::AssessmentDelegate;
use crate::traits::audio_device::{AudioDevice, CaptureFaultCallback, PlaybackCallback};
use crate::traits::result_scorer::ResultScorer;

#[derive(Default)]
struct FakeState {
    deny_permission: bool,
    fail_next_start: Option<String>,
    fail_next_stop: Option<String>,
    fail_next_playback: Option<String>,
    reported_duration: Option<Duration>,
    current_prompt: Option<PromptId>,
    pending_playback: Option<PlaybackCallback>,
    pending_fault: Option<CaptureFaultCallback>,
    permission_requests: usize,
    recordings_started: usize,
    recordings_stopped: usize,
    recordings_discarded: usize,
    playbacks_started: usize,
    playbacks_stopped: usize,
    releases: usize,
}

/// In-memory `AudioDevice` whose behaviour is scripted through a [`FakeHandle`].
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

/// Test-side view of a [`FakeDevice`], usable after the device moved into a controller.
#[derive(Clone)]
pub struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn new() -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeHandle { state },
        )
    }
}

impl FakeHandle {
    pub fn deny_permission(&self) {
        self.state.lock().deny_permission = true;
    }

    pub fn grant_permission(&self) {
        self.state.lock().deny_permission = false;
    }

    pub fn fail_next_start(&self, message: &str) {
        self.state.lock().fail_next_start = Some(message.to_string());
    }

    pub fn fail_next_stop(&self, message: &str) {
        self.state.lock().fail_next_stop = Some(message.to_string());
    }

    pub fn fail_next_playback(&self, message: &str) {
        self.state.lock().fail_next_playback = Some(message.to_string());
    }

    pub fn report_duration(&self, duration: Duration) {
        self.state.lock().reported_duration = Some(duration);
    }

    /// Fire the pending playback callback as the device thread would.
    pub fn complete_playback(&self) {
        self.settle_playback(PlaybackOutcome::Finished);
    }

    pub fn break_playback(&self, message: &str) {
        self.settle_playback(PlaybackOutcome::Failed(message.to_string()));
    }

    /// Report a fault on the active recording as the device thread would.
    pub fn break_recording(&self, message: &str) {
        let callback = self.state.lock().pending_fault.take();
        if let Some(callback) = callback {
            callback(message.to_string());
        }
    }

    fn settle_playback(&self, outcome: PlaybackOutcome) {
        let callback = self.state.lock().pending_playback.take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }

    pub fn permission_requests(&self) -> usize {
        self.state.lock().permission_requests
    }

    pub fn recordings_started(&self) -> usize {
        self.state.lock().recordings_started
    }

    pub fn recordings_stopped(&self) -> usize {
        self.state.lock().recordings_stopped
    }

    pub fn recordings_discarded(&self) -> usize {
        self.state.lock().recordings_discarded
    }

    pub fn playbacks_started(&self) -> usize {
        self.state.lock().playbacks_started
    }

    pub fn playbacks_stopped(&self) -> usize {
        self.state.lock().playbacks_stopped
    }

    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }
}

impl AudioDevice for FakeDevice {
    fn request_permission(&mut self) -> Result<bool, AssessmentError> {
        let mut s = self.state.lock();
        s.permission_requests += 1;
        Ok(!s.deny_permission)
    }

    fn start_recording(&mut self, prompt: &PromptId, on_fault: CaptureFaultCallback) -> Result<(), AssessmentError> {
        let mut s = self.state.lock();
        if let Some(message) = s.fail_next_start.take() {
            return Err(AssessmentError::DeviceError(message));
        }
        s.recordings_started += 1;
        s.current_prompt = Some(prompt.clone());
        s.pending_fault = Some(on_fault);
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<RecordedAudio, AssessmentError> {
        let mut s = self.state.lock();
        let prompt = s.current_prompt.take();
        s.pending_fault = None;
        if let Some(message) = s.fail_next_stop.take() {
            return Err(AssessmentError::DeviceError(message));
        }
        s.recordings_stopped += 1;
        let prompt = prompt.map(|p| p.to_string()).unwrap_or_default();
        Ok(RecordedAudio {
            location: PathBuf::from(format!("fake/{}-{}.wav", prompt, s.recordings_stopped)),
            duration: s.reported_duration,
            checksum: None,
        })
    }

    fn discard_recording(&mut self) -> Result<(), AssessmentError> {
        let mut s = self.state.lock();
        s.current_prompt = None;
        s.pending_fault = None;
        s.recordings_discarded += 1;
        Ok(())
    }

    fn start_playback(&mut self, _clip: &AudioRef, on_finished: PlaybackCallback) -> Result<(), AssessmentError> {
        let mut s = self.state.lock();
        if let Some(message) = s.fail_next_playback.take() {
            return Err(AssessmentError::DeviceError(message));
        }
        s.playbacks_started += 1;
        s.pending_playback = Some(on_finished);
        Ok(())
    }

    fn stop_playback(&mut self) -> Result<(), AssessmentError> {
        let mut s = self.state.lock();
        s.pending_playback = None;
        s.playbacks_stopped += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.state.lock().releases += 1;
    }
}

/// A round of `kind` with `count` sentence prompts and no answers yet.
pub fn empty_round(kind: RoundKind, count: usize) -> RoundRecord {
    let prompts = (0..count)
        .map(|i| Prompt::sentence(format!("p{}", i), format!("Prompt {}", i)))
        .collect();
    RoundRecord::new(kind, PromptSet::from_selection(prompts))
}

pub fn artifact_for(prompt: &Prompt, round_index: usize) -> CaptureArtifact {
    CaptureArtifact {
        id: uuid::Uuid::new_v4(),
        prompt_id: prompt.id().clone(),
        round_index,
        location: PathBuf::from(format!("fake/{}.wav", prompt.id())),
        duration_ms: 1000,
        recorded_at: chrono::Utc::now(),
        checksum: None,
    }
}

/// A round with every prompt answered, optionally sealed.
pub fn answered_round(kind: RoundKind, count: usize, finalize: bool) -> RoundRecord {
    let mut round = empty_round(kind, count);
    let prompts: Vec<Prompt> = round.prompt_set.iter().cloned().collect();
    for prompt in &prompts {
        round
            .push_artifact(artifact_for(prompt, kind.index()))
            .expect("round has room");
    }
    if finalize {
        round.finalize().expect("round is fully answered");
    }
    round
}

/// Scorer that reports a flat score and counts how often it was asked.
#[derive(Default)]
pub struct CountingScorer {
    calls: Mutex<usize>,
    last_record_complete: Mutex<Option<bool>>,
}

impl CountingScorer {
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn saw_complete_record(&self) -> Option<bool> {
        *self.last_record_complete.lock()
    }
}

impl ResultScorer for CountingScorer {
    fn score(&self, record: &SessionRecord) -> ResultSummary {
        *self.calls.lock() += 1;
        *self.last_record_complete.lock() = Some(record.is_complete());
        ResultSummary {
            overall_level: CefrLevel::B1,
            overall_score: 70,
            rounds: record
                .rounds()
                .iter()
                .map(|r| RoundScore {
                    round_index: r.round_index,
                    kind: r.kind,
                    score: 70,
                    level: CefrLevel::B1,
                })
                .collect(),
        }
    }
}

/// Event captured by [`RecordingDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub enum DelegateEvent {
    State { round_index: usize, state: RoundState, progress: f64 },
    Error(AssessmentError),
    RoundComplete(usize),
    SessionComplete,
}

#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    /// Progress values reported for one round, in order.
    pub fn progress_for(&self, round: usize) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DelegateEvent::State { round_index, progress, .. } if *round_index == round => Some(*progress),
                _ => None,
            })
            .collect()
    }
}

impl AssessmentDelegate for RecordingDelegate {
    fn on_round_state_changed(&self, round_index: usize, state: &RoundState, progress: f64) {
        self.events.lock().push(DelegateEvent::State {
            round_index,
            state: *state,
            progress,
        });
    }

    fn on_error(&self, error: &AssessmentError) {
        self.events.lock().push(DelegateEvent::Error(error.clone()));
    }

    fn on_round_complete(&self, record: &RoundRecord) {
        self.events.lock().push(DelegateEvent::RoundComplete(record.round_index));
    }

    fn on_session_complete(&self, _summary: &ResultSummary) {
        self.events.lock().push(DelegateEvent::SessionComplete);
    }
}
