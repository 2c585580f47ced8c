use serde::{Deserialize, Serialize};

use super::capture::CaptureArtifact;
use super::error::AssessmentError;
use super::prompt::PromptSet;

/// The three fixed assessment phases, in session order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    SentenceRepetition,
    ListenAndRepeat,
    FreeSpeech,
}

impl RoundKind {
    pub const ALL: [RoundKind; 3] = [
        RoundKind::SentenceRepetition,
        RoundKind::ListenAndRepeat,
        RoundKind::FreeSpeech,
    ];

    pub fn for_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        match self {
            Self::SentenceRepetition => 0,
            Self::ListenAndRepeat => 1,
            Self::FreeSpeech => 2,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SentenceRepetition => "Reading & Repetition",
            Self::ListenAndRepeat => "Listen & Repeat",
            Self::FreeSpeech => "Free Speech",
        }
    }

    /// Rounds whose prompts are played before the capture starts.
    pub fn requires_playback(&self) -> bool {
        matches!(self, Self::ListenAndRepeat)
    }
}

/// Everything captured for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_index: usize,
    pub kind: RoundKind,
    pub prompt_set: PromptSet,
    artifacts: Vec<CaptureArtifact>,
    finalized: bool,
}

impl RoundRecord {
    pub(crate) fn new(kind: RoundKind, prompt_set: PromptSet) -> Self {
        Self {
            round_index: kind.index(),
            kind,
            prompt_set,
            artifacts: Vec::new(),
            finalized: false,
        }
    }

    pub fn artifacts(&self) -> &[CaptureArtifact] {
        &self.artifacts
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Every prompt has exactly one artifact.
    pub fn is_fully_answered(&self) -> bool {
        self.artifacts.len() == self.prompt_set.len()
    }

    pub(crate) fn push_artifact(&mut self, artifact: CaptureArtifact) -> Result<(), AssessmentError> {
        if self.finalized {
            return Err(AssessmentError::InvalidIntent {
                intent: "record_artifact",
                state: "finalized round".into(),
            });
        }
        if self.artifacts.len() >= self.prompt_set.len() {
            return Err(AssessmentError::InvalidIntent {
                intent: "record_artifact",
                state: format!("round {} already has {} artifacts", self.round_index, self.artifacts.len()),
            });
        }
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Seal the round. Allowed exactly once, and only when fully answered.
    pub(crate) fn finalize(&mut self) -> Result<(), AssessmentError> {
        if self.finalized {
            return Err(AssessmentError::InvalidIntent {
                intent: "finalize",
                state: "finalized round".into(),
            });
        }
        if !self.is_fully_answered() {
            return Err(AssessmentError::InvalidIntent {
                intent: "finalize",
                state: format!(
                    "{} of {} prompts answered",
                    self.artifacts.len(),
                    self.prompt_set.len()
                ),
            });
        }
        self.finalized = true;
        Ok(())
    }
}
