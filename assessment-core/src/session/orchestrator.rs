use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::capture::controller::CaptureController;
use crate::models::capture::{DeviceEvent, PlaybackEvent};
use crate::models::config::{AssessmentConfiguration, SpeakingHint};
use crate::models::error::AssessmentError;
use crate::models::prompt::Prompt;
use crate::models::result::ResultSummary;
use crate::models::round::{RoundKind, RoundRecord};
use crate::models::session::{SessionRecord, SessionStatus};
use crate::models::state::RoundState;
use crate::prompts::selector::select_prompts;
use crate::session::round::RoundMachine;
use crate::traits::assessment_delegate::AssessmentDelegate;
use crate::traits::audio_device::AudioDevice;
use crate::traits::result_scorer::ResultScorer;

/// Builder for [`AssessmentSession`].
pub struct SessionBuilder<D: AudioDevice, S: ResultScorer> {
    controller: CaptureController<D>,
    scorer: S,
    config: AssessmentConfiguration,
    rng: Option<StdRng>,
    delegate: Option<Arc<dyn AssessmentDelegate>>,
}

impl<D: AudioDevice, S: ResultScorer> SessionBuilder<D, S> {
    pub fn config(mut self, config: AssessmentConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Seed prompt selection for reproducible sessions.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn AssessmentDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Validate the configuration and enter round 1.
    pub fn start(self) -> Result<AssessmentSession<D, S>, AssessmentError> {
        self.config.validate()?;

        let mut session = AssessmentSession {
            config: self.config,
            controller: self.controller,
            scorer: self.scorer,
            rng: self.rng.unwrap_or_else(StdRng::from_entropy),
            delegate: self.delegate,
            record: SessionRecord::new(),
            current: None,
            result: None,
        };
        log::info!("Assessment session {} started", session.record.id);
        session.enter_round(RoundKind::SentenceRepetition)?;
        Ok(session)
    }
}

/// Sequences the three rounds and hands the finished record to the scorer.
///
/// ```text
/// [intent] → AssessmentSession → RoundMachine → CaptureController → [AudioDevice]
///                  ↓ (round 3 complete)
///             ResultScorer → ResultSummary
/// ```
///
/// Intents are processed one at a time on the caller's thread. Playback
/// completion from the device is queued by the controller and applied by
/// [`poll_device_events`](Self::poll_device_events) or
/// [`wait_for_playback`](Self::wait_for_playback).
pub struct AssessmentSession<D: AudioDevice, S: ResultScorer> {
    config: AssessmentConfiguration,
    controller: CaptureController<D>,
    scorer: S,
    rng: StdRng,
    delegate: Option<Arc<dyn AssessmentDelegate>>,
    record: SessionRecord,
    current: Option<RoundMachine>,
    result: Option<ResultSummary>,
}

impl<D: AudioDevice, S: ResultScorer> AssessmentSession<D, S> {
    pub fn builder(controller: CaptureController<D>, scorer: S) -> SessionBuilder<D, S> {
        SessionBuilder {
            controller,
            scorer,
            config: AssessmentConfiguration::default(),
            rng: None,
            delegate: None,
        }
    }

    // --- Queries ---

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn status(&self) -> SessionStatus {
        self.record.status
    }

    pub fn config(&self) -> &AssessmentConfiguration {
        &self.config
    }

    pub fn controller(&self) -> &CaptureController<D> {
        &self.controller
    }

    /// Zero-based index of the active round; the last round once completed.
    pub fn current_round_index(&self) -> usize {
        match &self.current {
            Some(round) => round.round_index(),
            None => self.record.rounds().len().saturating_sub(1),
        }
    }

    pub fn current_round_kind(&self) -> Option<RoundKind> {
        self.current.as_ref().map(RoundMachine::kind)
    }

    pub fn round_state(&self) -> Option<RoundState> {
        self.current.as_ref().map(RoundMachine::state)
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        self.current.as_ref().and_then(RoundMachine::current_prompt)
    }

    /// `(prompt number, prompt count)` within the active round.
    pub fn round_position(&self) -> Option<(usize, usize)> {
        self.current.as_ref().map(RoundMachine::position)
    }

    pub fn round_progress(&self) -> f64 {
        self.current.as_ref().map_or(1.0, RoundMachine::progress)
    }

    /// Session progress with each round weighted equally.
    pub fn overall_progress(&self) -> f64 {
        let finished = self.record.rounds().len() as f64;
        let partial = self.current.as_ref().map_or(0.0, RoundMachine::progress);
        ((finished + partial) / RoundKind::ALL.len() as f64).min(1.0)
    }

    /// Finalized rounds so far.
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// The active round's record, including artifacts captured so far.
    pub fn current_round(&self) -> Option<&RoundRecord> {
        self.current.as_ref().map(RoundMachine::record)
    }

    /// Timer value and advisory message while free speech is recording.
    pub fn free_speech_hint(&self) -> Option<(Duration, SpeakingHint)> {
        let round = self.current.as_ref()?;
        if round.kind() != RoundKind::FreeSpeech {
            return None;
        }
        let session = round.capture_session()?;
        let elapsed = (Utc::now() - session.started_at).to_std().unwrap_or_default();
        Some((elapsed, SpeakingHint::for_elapsed(elapsed, &self.config.free_speech)))
    }

    /// The scored result. Fails until round 3 has been finalized.
    pub fn result(&self) -> Result<&ResultSummary, AssessmentError> {
        match (&self.record.status, &self.result) {
            (SessionStatus::Completed, Some(result)) => Ok(result),
            _ => Err(AssessmentError::SessionNotComplete),
        }
    }

    // --- Intents ---

    pub fn start_capture(&mut self) -> Result<(), AssessmentError> {
        self.drive("start_capture", |round, controller| round.start_capture(controller))
    }

    pub fn stop_capture(&mut self) -> Result<(), AssessmentError> {
        self.drive("stop_capture", |round, controller| round.stop_capture(controller))
    }

    pub fn play_prompt(&mut self) -> Result<(), AssessmentError> {
        self.drive("play_prompt", |round, controller| round.play_prompt(controller))
    }

    pub fn advance(&mut self) -> Result<(), AssessmentError> {
        self.drive("advance", |round, _| round.advance())
    }

    /// Apply a playback completion. Returns false for stale events.
    pub fn handle_playback_event(&mut self, event: PlaybackEvent) -> Result<bool, AssessmentError> {
        if self.current.is_none() {
            log::warn!("Ignoring playback event after session completed");
            return Ok(false);
        }
        self.drive("playback_finished", |round, controller| {
            round.handle_playback_event(controller, event)
        })
    }

    /// Apply a playback completion or recording fault reported by the device.
    ///
    /// A recording fault discards the capture, returns the round to
    /// `AwaitingPrompt` and comes back as a recoverable `DeviceError`.
    pub fn handle_device_event(&mut self, event: DeviceEvent) -> Result<bool, AssessmentError> {
        match event {
            DeviceEvent::Playback(event) => self.handle_playback_event(event),
            DeviceEvent::CaptureFault(fault) => {
                if self.current.is_none() {
                    log::warn!("Ignoring recording fault after session completed");
                    return Ok(false);
                }
                self.drive("capture_fault", |round, controller| {
                    round.handle_capture_fault(controller, fault)
                })
            }
        }
    }

    /// Apply every queued device event without blocking.
    ///
    /// Returns how many events changed the round. Stops at the first event
    /// that fails; later events stay queued.
    pub fn poll_device_events(&mut self) -> Result<usize, AssessmentError> {
        let mut applied = 0;
        while let Some(event) = self.controller.try_device_event() {
            if self.handle_device_event(event)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Block up to `timeout` for the next device event and apply it.
    ///
    /// Returns `Ok(false)` on timeout or when the event was stale.
    pub fn wait_for_playback(&mut self, timeout: Duration) -> Result<bool, AssessmentError> {
        match self.controller.wait_device_event(timeout) {
            Some(event) => self.handle_device_event(event),
            None => Ok(false),
        }
    }

    /// Discard any in-flight capture or playback, e.g. when the user leaves.
    ///
    /// Returns true if the device was released. Repeated calls are no-ops.
    pub fn abandon(&mut self) -> bool {
        match self.current.as_mut() {
            Some(round) => round.cancel(&self.controller),
            None => false,
        }
    }

    // --- Internal helpers ---

    fn drive<T>(
        &mut self,
        intent: &'static str,
        apply: impl FnOnce(&mut RoundMachine, &CaptureController<D>) -> Result<T, AssessmentError>,
    ) -> Result<T, AssessmentError> {
        let outcome = match self.current.as_mut() {
            Some(round) => apply(round, &self.controller),
            None => Err(AssessmentError::InvalidIntent {
                intent,
                state: "session completed".into(),
            }),
        };
        let outcome = outcome.and_then(|value| {
            self.settle_round()?;
            Ok(value)
        });
        if let Err(ref e) = outcome {
            self.report(e);
        }
        outcome
    }

    fn enter_round(&mut self, kind: RoundKind) -> Result<(), AssessmentError> {
        let (pool, count) = self.config.plan(kind);
        let prompts = select_prompts(pool, count, &mut self.rng)?;

        let mut round = RoundMachine::new(kind, prompts, self.config.auto_advance);
        if let Some(ref delegate) = self.delegate {
            round.set_delegate(Arc::clone(delegate));
        }
        log::info!(
            "Round {} ({}) started with {} prompt(s)",
            kind.index() + 1,
            kind.title(),
            count
        );
        round.enter();
        self.current = Some(round);
        Ok(())
    }

    /// Move a completed round into the record and start the next one.
    fn settle_round(&mut self) -> Result<(), AssessmentError> {
        if !self.current.as_ref().is_some_and(RoundMachine::is_complete) {
            return Ok(());
        }
        let Some(round) = self.current.take() else {
            return Ok(());
        };

        let record = round.into_record();
        log::info!(
            "Round {} ({}) complete with {} artifact(s)",
            record.round_index + 1,
            record.kind.title(),
            record.artifacts().len()
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_round_complete(&record);
        }
        let next = RoundKind::for_index(record.round_index + 1);
        self.record.push_round(record);

        match next {
            Some(kind) => self.enter_round(kind),
            None => self.finish(),
        }
    }

    fn finish(&mut self) -> Result<(), AssessmentError> {
        if !self.record.is_complete() {
            return Err(AssessmentError::SessionNotComplete);
        }

        let summary = self.scorer.score(&self.record);
        if summary.rounds.len() != RoundKind::ALL.len() {
            log::warn!(
                "Scorer returned {} round score(s), expected {}",
                summary.rounds.len(),
                RoundKind::ALL.len()
            );
        }
        self.record.status = SessionStatus::Completed;
        log::info!(
            "Assessment session {} completed: {} ({})",
            self.record.id,
            summary.overall_level,
            summary.overall_score
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_session_complete(&summary);
        }
        self.result = Some(summary);
        Ok(())
    }

    fn report(&self, error: &AssessmentError) {
        if error.is_recoverable() {
            log::warn!("Recoverable error: {}", error);
        } else {
            log::error!("Assessment error: {}", error);
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

impl<D: AudioDevice, S: ResultScorer> Drop for AssessmentSession<D, S> {
    fn drop(&mut self) {
        if self.abandon() {
            log::info!("Session {} dropped mid-capture; recording discarded", self.record.id);
        }
    }
}
