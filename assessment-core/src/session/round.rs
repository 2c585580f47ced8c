use std::sync::Arc;

use crate::capture::controller::CaptureController;
use crate::models::capture::{CaptureFault, CaptureSession, DeviceEvent, PlaybackEvent, PlaybackOutcome, PlaybackTicket};
use crate::models::error::AssessmentError;
use crate::models::prompt::{Prompt, PromptSet};
use crate::models::round::{RoundKind, RoundRecord};
use crate::models::state::RoundState;
use crate::traits::assessment_delegate::AssessmentDelegate;
use crate::traits::audio_device::AudioDevice;

/// Drives one round through its prompts.
///
/// Owns the round's prompt set and artifacts; borrows the capture controller
/// for each intent. A failed device operation always lands back in
/// `AwaitingPrompt` for the same index with no artifact recorded.
pub struct RoundMachine {
    record: RoundRecord,
    state: RoundState,
    capture: Option<CaptureSession>,
    playback: Option<PlaybackTicket>,
    auto_advance: bool,
    delegate: Option<Arc<dyn AssessmentDelegate>>,
}

impl RoundMachine {
    pub fn new(kind: RoundKind, prompt_set: PromptSet, auto_advance: bool) -> Self {
        Self {
            record: RoundRecord::new(kind, prompt_set),
            state: RoundState::AwaitingPrompt { index: 0 },
            capture: None,
            playback: None,
            auto_advance,
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn AssessmentDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Report the initial state. Called once the round becomes current.
    pub fn enter(&mut self) {
        self.set_state(self.state);
    }

    pub fn kind(&self) -> RoundKind {
        self.record.kind
    }

    pub fn round_index(&self) -> usize {
        self.record.round_index
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn record(&self) -> &RoundRecord {
        &self.record
    }

    pub fn into_record(self) -> RoundRecord {
        self.record
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        self.state.index().and_then(|i| self.record.prompt_set.get(i))
    }

    /// The recording in progress, if the round is capturing.
    pub fn capture_session(&self) -> Option<&CaptureSession> {
        self.capture.as_ref()
    }

    /// Fraction of prompts left behind; reaches 1.0 only at `Complete`.
    ///
    /// A prompt under review still counts as current, so holding the last
    /// review never reports a finished round.
    pub fn progress(&self) -> f64 {
        let total = self.record.prompt_set.len();
        match self.state.index() {
            Some(index) if total > 0 => index as f64 / total as f64,
            _ => 1.0,
        }
    }

    /// One-based position for "Question n of m" displays.
    pub fn position(&self) -> (usize, usize) {
        let total = self.record.prompt_set.len();
        match self.state.index() {
            Some(index) => (index + 1, total),
            None => (total, total),
        }
    }

    /// `(i + 1) / len` for the prompt currently shown.
    pub fn position_fraction(&self) -> f64 {
        let (position, total) = self.position();
        if total == 0 {
            return 1.0;
        }
        position as f64 / total as f64
    }

    /// User starts recording. Transitions: awaiting(i) → capturing(i).
    pub fn start_capture<D: AudioDevice>(&mut self, controller: &CaptureController<D>) -> Result<(), AssessmentError> {
        let RoundState::AwaitingPrompt { index } = self.state else {
            return Err(self.rejected("start_capture"));
        };
        if self.kind().requires_playback() {
            return Err(AssessmentError::InvalidIntent {
                intent: "start_capture",
                state: format!("{} starts from playback", self.kind().title()),
            });
        }
        Self::ensure_permission(controller)?;
        self.open_capture(controller, index)
    }

    /// User plays the clip. Transitions: awaiting(i) → playing(i).
    pub fn play_prompt<D: AudioDevice>(&mut self, controller: &CaptureController<D>) -> Result<(), AssessmentError> {
        let RoundState::AwaitingPrompt { index } = self.state else {
            return Err(self.rejected("play_prompt"));
        };
        if !self.kind().requires_playback() {
            return Err(AssessmentError::InvalidIntent {
                intent: "play_prompt",
                state: format!("{} has no audio prompts", self.kind().title()),
            });
        }
        let clip = self
            .record
            .prompt_set
            .get(index)
            .and_then(Prompt::clip)
            .cloned()
            .ok_or_else(|| {
                AssessmentError::InvalidConfiguration(format!("prompt {} has no clip", index))
            })?;

        // Ask before playing so a denial does not waste the clip.
        Self::ensure_permission(controller)?;

        let ticket = controller.play_prompt(&clip)?;
        self.playback = Some(ticket);
        self.set_state(RoundState::Playing { index });
        Ok(())
    }

    /// Playback ended. A finished playback chains straight into capturing(i).
    ///
    /// Returns `Ok(false)` for events that do not belong to the current playback.
    pub fn handle_playback_event<D: AudioDevice>(
        &mut self,
        controller: &CaptureController<D>,
        event: PlaybackEvent,
    ) -> Result<bool, AssessmentError> {
        let index = match self.state {
            RoundState::Playing { index } if self.playback == Some(event.ticket) => index,
            state => {
                log::warn!("Ignoring playback event in state {}", state);
                return Ok(false);
            }
        };

        self.playback = None;
        controller.finish_playback(event.ticket);

        let result = match event.outcome {
            PlaybackOutcome::Finished => self.open_capture(controller, index),
            PlaybackOutcome::Failed(message) => Err(AssessmentError::DeviceError(message)),
        };
        if let Err(e) = result {
            self.set_state(RoundState::AwaitingPrompt { index });
            return Err(e);
        }
        Ok(true)
    }

    /// The recording failed on the device. Transitions: capturing(i) → awaiting(i).
    ///
    /// The partial audio is discarded and the device released. Returns
    /// `Ok(false)` for faults of a recording that is no longer current.
    pub fn handle_capture_fault<D: AudioDevice>(
        &mut self,
        controller: &CaptureController<D>,
        fault: CaptureFault,
    ) -> Result<bool, AssessmentError> {
        let current = self.capture.as_ref().map(|session| session.id);
        let index = match self.state {
            RoundState::Capturing { index } if current == Some(fault.session_id) => index,
            state => {
                log::warn!("Ignoring recording fault in state {}", state);
                return Ok(false);
            }
        };

        if let Some(session) = self.capture.take() {
            controller.cancel_capture(&session);
        }
        log::warn!("Recording failed for prompt {}: {}", index, fault.message);
        self.set_state(RoundState::AwaitingPrompt { index });
        Err(AssessmentError::DeviceError(fault.message))
    }

    pub fn handle_device_event<D: AudioDevice>(
        &mut self,
        controller: &CaptureController<D>,
        event: DeviceEvent,
    ) -> Result<bool, AssessmentError> {
        match event {
            DeviceEvent::Playback(event) => self.handle_playback_event(controller, event),
            DeviceEvent::CaptureFault(fault) => self.handle_capture_fault(controller, fault),
        }
    }

    /// Stop recording. Transitions: capturing(i) → reviewing(i) [→ next].
    pub fn stop_capture<D: AudioDevice>(&mut self, controller: &CaptureController<D>) -> Result<(), AssessmentError> {
        let RoundState::Capturing { index } = self.state else {
            return Err(AssessmentError::NoActiveCapture);
        };
        let session = self.capture.take().ok_or(AssessmentError::NoActiveCapture)?;

        let artifact = match controller.stop_capture(&session) {
            Ok(artifact) => artifact,
            Err(e) => {
                self.set_state(RoundState::AwaitingPrompt { index });
                return Err(e);
            }
        };
        self.record.push_artifact(artifact)?;
        self.set_state(RoundState::Reviewing { index });

        if self.auto_advance {
            self.advance()?;
        }
        Ok(())
    }

    /// Leave review. Transitions: reviewing(i) → awaiting(i+1) | complete.
    pub fn advance(&mut self) -> Result<(), AssessmentError> {
        let RoundState::Reviewing { index } = self.state else {
            return Err(self.rejected("advance"));
        };
        if index + 1 < self.record.prompt_set.len() {
            self.set_state(RoundState::AwaitingPrompt { index: index + 1 });
        } else {
            self.record.finalize()?;
            self.set_state(RoundState::Complete);
        }
        Ok(())
    }

    /// Abort an in-flight capture or playback, discarding it.
    ///
    /// Returns true if something was released. Repeated calls are no-ops.
    pub fn cancel<D: AudioDevice>(&mut self, controller: &CaptureController<D>) -> bool {
        let released = match self.state {
            RoundState::Capturing { .. } => self
                .capture
                .take()
                .is_some_and(|session| controller.cancel_capture(&session)),
            RoundState::Playing { .. } => self
                .playback
                .take()
                .is_some_and(|ticket| controller.cancel_playback(ticket)),
            _ => return false,
        };
        if let Some(index) = self.state.index() {
            self.set_state(RoundState::AwaitingPrompt { index });
        }
        released
    }

    fn ensure_permission<D: AudioDevice>(controller: &CaptureController<D>) -> Result<(), AssessmentError> {
        if controller.request_permission()? {
            Ok(())
        } else {
            Err(AssessmentError::PermissionDenied)
        }
    }

    fn open_capture<D: AudioDevice>(&mut self, controller: &CaptureController<D>, index: usize) -> Result<(), AssessmentError> {
        let prompt_id = self
            .record
            .prompt_set
            .get(index)
            .map(|p| p.id().clone())
            .ok_or(AssessmentError::NoActiveCapture)?;
        let session = controller.start_capture(&prompt_id, self.record.round_index)?;
        self.capture = Some(session);
        self.set_state(RoundState::Capturing { index });
        Ok(())
    }

    fn set_state(&mut self, state: RoundState) {
        self.state = state;
        let progress = self.progress();
        log::debug!(
            "Round {} ({}) → {} [{:.2}]",
            self.record.round_index + 1,
            self.kind().title(),
            state,
            progress
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_round_state_changed(self.record.round_index, &state, progress);
        }
    }

    fn rejected(&self, intent: &'static str) -> AssessmentError {
        AssessmentError::InvalidIntent {
            intent,
            state: self.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::prompt::{AudioRef, PromptPool};
    use crate::prompts::{builtin, selector};
    use crate::test_support::{FakeDevice, FakeHandle, RecordingDelegate};

    fn controller() -> (CaptureController<FakeDevice>, FakeHandle) {
        let (device, handle) = FakeDevice::new();
        (CaptureController::new(device), handle)
    }

    fn next_playback(ctl: &CaptureController<FakeDevice>) -> PlaybackEvent {
        match ctl.try_device_event() {
            Some(DeviceEvent::Playback(event)) => event,
            other => panic!("expected a playback event, got {:?}", other),
        }
    }

    fn sentence_round(count: usize) -> RoundMachine {
        let mut rng = StdRng::seed_from_u64(11);
        let set = selector::select_prompts(&builtin::sentences(), count, &mut rng).unwrap();
        RoundMachine::new(RoundKind::SentenceRepetition, set, true)
    }

    fn audio_round(count: usize) -> RoundMachine {
        let pool = PromptPool::new(vec![
            Prompt::audio_clip("a1", AudioRef::new("a1.mp3")),
            Prompt::audio_clip("a2", AudioRef::new("a2.mp3")),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let set = selector::select_prompts(&pool, count, &mut rng).unwrap();
        RoundMachine::new(RoundKind::ListenAndRepeat, set, true)
    }

    #[test]
    fn five_capture_cycles_complete_the_round() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(5);

        for i in 0..5 {
            assert_eq!(round.state(), RoundState::AwaitingPrompt { index: i });
            assert_eq!(round.position(), (i + 1, 5));
            round.start_capture(&ctl).unwrap();
            assert_eq!(round.state(), RoundState::Capturing { index: i });
            round.stop_capture(&ctl).unwrap();
        }

        assert!(round.is_complete());
        assert!(round.record().is_finalized());
        assert_eq!(round.record().artifacts().len(), 5);
        assert_relative_eq!(round.progress(), 1.0);
        assert_eq!(handle.recordings_stopped(), 5);
        assert_eq!(handle.permission_requests(), 5);
    }

    #[test]
    fn progress_is_monotone_and_full_only_at_completion() {
        let (ctl, _handle) = controller();
        let delegate = Arc::new(RecordingDelegate::default());
        let mut round = sentence_round(5);
        round.set_delegate(delegate.clone());
        round.enter();

        while !round.is_complete() {
            round.start_capture(&ctl).unwrap();
            round.stop_capture(&ctl).unwrap();
        }

        let progress = delegate.progress_for(0);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        let (last, earlier) = progress.split_last().unwrap();
        assert_relative_eq!(*last, 1.0);
        assert!(earlier.iter().all(|p| *p < 1.0));
    }

    #[test]
    fn permission_denial_keeps_state() {
        let (ctl, handle) = controller();
        handle.deny_permission();
        let mut round = sentence_round(5);

        assert_eq!(round.start_capture(&ctl), Err(AssessmentError::PermissionDenied));
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });

        handle.grant_permission();
        round.start_capture(&ctl).unwrap();
        assert_eq!(round.state(), RoundState::Capturing { index: 0 });
    }

    #[test]
    fn device_failure_on_stop_is_retryable_without_artifact() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(2);

        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();

        round.start_capture(&ctl).unwrap();
        handle.fail_next_stop("buffer overrun");
        assert!(round.stop_capture(&ctl).unwrap_err().is_recoverable());
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 1 });
        assert_eq!(round.record().artifacts().len(), 1);

        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();
        assert!(round.is_complete());
    }

    #[test]
    fn device_failure_on_start_stays_on_prompt() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(3);
        handle.fail_next_start("mic unplugged");

        assert!(matches!(round.start_capture(&ctl), Err(AssessmentError::DeviceError(_))));
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });
        assert!(round.record().artifacts().is_empty());
    }

    #[test]
    fn stop_outside_capture_is_rejected() {
        let (ctl, _handle) = controller();
        let mut round = sentence_round(1);
        assert_eq!(round.stop_capture(&ctl), Err(AssessmentError::NoActiveCapture));
    }

    #[test]
    fn playback_completion_starts_capture_without_user_action() {
        let (ctl, handle) = controller();
        let mut round = audio_round(2);

        for i in 0..2 {
            round.play_prompt(&ctl).unwrap();
            assert_eq!(round.state(), RoundState::Playing { index: i });
            assert_eq!(handle.recordings_started(), i);

            handle.complete_playback();
            let event = next_playback(&ctl);
            assert!(round.handle_playback_event(&ctl, event).unwrap());
            assert_eq!(round.state(), RoundState::Capturing { index: i });
            assert_eq!(handle.recordings_started(), i + 1);

            round.stop_capture(&ctl).unwrap();
        }
        assert!(round.is_complete());
        assert_eq!(handle.playbacks_started(), 2);
        assert_eq!(handle.permission_requests(), 2);
    }

    #[test]
    fn listen_round_rejects_direct_start() {
        let (ctl, _handle) = controller();
        let mut round = audio_round(2);
        assert!(matches!(
            round.start_capture(&ctl),
            Err(AssessmentError::InvalidIntent { intent: "start_capture", .. })
        ));
    }

    #[test]
    fn sentence_round_rejects_playback() {
        let (ctl, _handle) = controller();
        let mut round = sentence_round(2);
        assert!(matches!(
            round.play_prompt(&ctl),
            Err(AssessmentError::InvalidIntent { intent: "play_prompt", .. })
        ));
    }

    #[test]
    fn failed_playback_returns_to_prompt() {
        let (ctl, handle) = controller();
        let mut round = audio_round(2);

        round.play_prompt(&ctl).unwrap();
        handle.break_playback("decoder error");
        let event = next_playback(&ctl);
        assert_eq!(
            round.handle_playback_event(&ctl, event),
            Err(AssessmentError::DeviceError("decoder error".into()))
        );
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });
        assert!(ctl.activity().is_idle());

        handle.fail_next_playback("speaker busy");
        assert!(round.play_prompt(&ctl).is_err());
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });
    }

    #[test]
    fn recording_fault_discards_and_returns_to_prompt() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(3);
        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();
        round.start_capture(&ctl).unwrap();
        let releases_before = handle.releases();

        handle.break_recording("microphone unplugged");
        let event = ctl.try_device_event().unwrap();
        assert_eq!(
            round.handle_device_event(&ctl, event),
            Err(AssessmentError::DeviceError("microphone unplugged".into()))
        );

        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 1 });
        assert!(round.capture_session().is_none());
        assert_eq!(round.record().artifacts().len(), 1);
        assert_eq!(handle.recordings_discarded(), 1);
        assert_eq!(handle.releases(), releases_before + 1);
        assert!(ctl.activity().is_idle());

        round.start_capture(&ctl).unwrap();
        assert_eq!(round.state(), RoundState::Capturing { index: 1 });
    }

    #[test]
    fn fault_of_a_finished_recording_is_ignored() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(2);
        round.start_capture(&ctl).unwrap();
        let stale = CaptureFault {
            session_id: round.capture_session().unwrap().id,
            message: "late".into(),
        };
        round.stop_capture(&ctl).unwrap();
        round.start_capture(&ctl).unwrap();

        assert_eq!(round.handle_capture_fault(&ctl, stale), Ok(false));
        assert_eq!(round.state(), RoundState::Capturing { index: 1 });
        assert_eq!(handle.recordings_discarded(), 0);
    }

    #[test]
    fn stale_playback_event_is_ignored() {
        let (ctl, handle) = controller();
        let mut round = audio_round(2);

        round.play_prompt(&ctl).unwrap();
        handle.complete_playback();
        let event = next_playback(&ctl);
        assert!(round.cancel(&ctl));

        assert_eq!(round.handle_playback_event(&ctl, event), Ok(false));
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });
        assert_eq!(handle.recordings_started(), 0);
    }

    #[test]
    fn manual_advance_holds_review() {
        let (ctl, _handle) = controller();
        let mut rng = StdRng::seed_from_u64(2);
        let set = selector::select_prompts(&builtin::sentences(), 2, &mut rng).unwrap();
        let mut round = RoundMachine::new(RoundKind::SentenceRepetition, set, false);

        assert!(round.advance().is_err());
        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();
        assert_eq!(round.state(), RoundState::Reviewing { index: 0 });
        assert!(round.start_capture(&ctl).is_err());

        round.advance().unwrap();
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 1 });
        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();
        round.advance().unwrap();
        assert!(round.is_complete());
    }

    #[test]
    fn cancel_discards_capture_once() {
        let (ctl, handle) = controller();
        let mut round = sentence_round(3);
        round.start_capture(&ctl).unwrap();

        assert!(round.cancel(&ctl));
        assert!(!round.cancel(&ctl));
        assert_eq!(round.state(), RoundState::AwaitingPrompt { index: 0 });
        assert!(round.record().artifacts().is_empty());
        assert_eq!(handle.releases(), 1);
        assert_eq!(handle.recordings_discarded(), 1);
    }

    #[test]
    fn position_fraction_tracks_prompt_index() {
        let (ctl, _handle) = controller();
        let mut round = sentence_round(4);
        assert_relative_eq!(round.position_fraction(), 0.25);
        round.start_capture(&ctl).unwrap();
        round.stop_capture(&ctl).unwrap();
        assert_relative_eq!(round.position_fraction(), 0.5);
        assert_relative_eq!(round.progress(), 0.25);
    }
}
