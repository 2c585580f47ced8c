use std::time::Duration;

use super::error::AssessmentError;
use super::prompt::PromptPool;
use super::round::RoundKind;
use crate::prompts::builtin;

/// Elapsed-time thresholds shown during free speech. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSpeechGuidance {
    pub may_stop_after_secs: u64,
    pub wrap_up_after_secs: u64,
}

impl Default for FreeSpeechGuidance {
    fn default() -> Self {
        Self {
            may_stop_after_secs: 120,
            wrap_up_after_secs: 180,
        }
    }
}

/// Message to show alongside the free-speech timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakingHint {
    KeepGoing,
    MayStop,
    WrapUp,
}

impl SpeakingHint {
    pub fn for_elapsed(elapsed: Duration, guidance: &FreeSpeechGuidance) -> Self {
        let secs = elapsed.as_secs();
        if secs < guidance.may_stop_after_secs {
            Self::KeepGoing
        } else if secs < guidance.wrap_up_after_secs {
            Self::MayStop
        } else {
            Self::WrapUp
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::KeepGoing => "Keep going...",
            Self::MayStop => "You can stop anytime now",
            Self::WrapUp => "Great! Feel free to wrap up",
        }
    }
}

/// Format a timer value as `m:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Configuration for an assessment session.
#[derive(Debug, Clone)]
pub struct AssessmentConfiguration {
    pub sentence_pool: PromptPool,
    pub audio_pool: PromptPool,
    pub topic_pool: PromptPool,

    /// Prompts per round (default: 5, 5, 1).
    pub sentence_count: usize,
    pub audio_count: usize,
    pub topic_count: usize,

    /// Leave `Reviewing` immediately after each stop (default: true).
    /// When false, the `advance` intent is required.
    pub auto_advance: bool,

    pub free_speech: FreeSpeechGuidance,
}

impl AssessmentConfiguration {
    /// Pool and prompt count for a round.
    pub fn plan(&self, kind: RoundKind) -> (&PromptPool, usize) {
        match kind {
            RoundKind::SentenceRepetition => (&self.sentence_pool, self.sentence_count),
            RoundKind::ListenAndRepeat => (&self.audio_pool, self.audio_count),
            RoundKind::FreeSpeech => (&self.topic_pool, self.topic_count),
        }
    }

    pub fn validate(&self) -> Result<(), AssessmentError> {
        for kind in RoundKind::ALL {
            let (pool, count) = self.plan(kind);
            if count == 0 {
                return Err(AssessmentError::InvalidConfiguration(format!(
                    "{} needs at least one prompt",
                    kind.title()
                )));
            }
            if count > pool.len() {
                return Err(AssessmentError::InsufficientPoolSize {
                    requested: count,
                    available: pool.len(),
                });
            }
        }
        if self.topic_count != 1 {
            return Err(AssessmentError::InvalidConfiguration(format!(
                "free speech uses a single topic, got {}",
                self.topic_count
            )));
        }
        if self.audio_pool.prompts().iter().any(|p| p.clip().is_none()) {
            return Err(AssessmentError::InvalidConfiguration(
                "audio pool contains prompts without a clip".into(),
            ));
        }
        if self.free_speech.wrap_up_after_secs < self.free_speech.may_stop_after_secs {
            return Err(AssessmentError::InvalidConfiguration(
                "wrap-up threshold precedes may-stop threshold".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AssessmentConfiguration {
    fn default() -> Self {
        Self {
            sentence_pool: builtin::sentences(),
            audio_pool: builtin::audio_clips(),
            topic_pool: builtin::topics(),
            sentence_count: 5,
            audio_count: 5,
            topic_count: 1,
            auto_advance: true,
            free_speech: FreeSpeechGuidance::default(),
        }
    }
}
