use std::sync::Arc;

use crate::models::capture::{PlaybackOutcome, RecordedAudio};
use crate::models::error::AssessmentError;
use crate::models::prompt::{AudioRef, PromptId};

/// Callback invoked once when a playback ends, from whatever thread the
/// backend plays on. Keep it minimal; the controller only forwards it.
pub type PlaybackCallback = Arc<dyn Fn(PlaybackOutcome) + Send + Sync + 'static>;

/// Callback for a recording that fails after it started. Takes a description
/// of the fault and may fire at most once per recording.
pub type CaptureFaultCallback = Arc<dyn Fn(String) + Send + Sync + 'static>;

/// Interface to the platform audio subsystem.
///
/// Only the `CaptureController` talks to an `AudioDevice`; it serialises
/// every call and enforces that recording and playback never overlap.
pub trait AudioDevice: Send {
    /// Ask for (or re-check) microphone permission.
    fn request_permission(&mut self) -> Result<bool, AssessmentError>;

    /// Begin recording the response to `prompt`.
    ///
    /// `on_fault` reports a failure that happens while recording. It must not
    /// fire once the recording was stopped or discarded.
    fn start_recording(&mut self, prompt: &PromptId, on_fault: CaptureFaultCallback) -> Result<(), AssessmentError>;

    /// Stop the active recording and return where it was stored.
    fn stop_recording(&mut self) -> Result<RecordedAudio, AssessmentError>;

    /// Stop the active recording and throw the audio away.
    fn discard_recording(&mut self) -> Result<(), AssessmentError>;

    /// Start playing `clip`; `on_finished` fires exactly once unless the
    /// playback is stopped first.
    fn start_playback(&mut self, clip: &AudioRef, on_finished: PlaybackCallback) -> Result<(), AssessmentError>;

    /// Stop the active playback without firing its callback.
    fn stop_playback(&mut self) -> Result<(), AssessmentError>;

    /// Release any hardware still held. Must be safe to call at any time.
    fn release(&mut self);
}
