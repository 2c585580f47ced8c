use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single recording attempt.
///
/// ```text
/// idle → preparing → recording → stopped
///            ↓           ↓
///          failed      failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Idle,
    Preparing,
    Recording,
    Stopped,
    Failed,
}

impl CaptureStatus {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// Round state machine.
///
/// State transitions:
/// ```text
/// awaiting(i) → [playing(i) →] capturing(i) → reviewing(i) → awaiting(i+1)
///                                                   ↓
///                                                complete
/// ```
/// Device failures in `Playing`/`Capturing` fall back to `AwaitingPrompt(i)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoundState {
    AwaitingPrompt { index: usize },
    Playing { index: usize },
    Capturing { index: usize },
    Reviewing { index: usize },
    Complete,
}

impl RoundState {
    /// Prompt index this state refers to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::AwaitingPrompt { index }
            | Self::Playing { index }
            | Self::Capturing { index }
            | Self::Reviewing { index } => Some(*index),
            Self::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether the device is held in this state.
    pub fn holds_device(&self) -> bool {
        matches!(self, Self::Playing { .. } | Self::Capturing { .. })
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingPrompt { index } => write!(f, "awaiting({index})"),
            Self::Playing { index } => write!(f, "playing({index})"),
            Self::Capturing { index } => write!(f, "capturing({index})"),
            Self::Reviewing { index } => write!(f, "reviewing({index})"),
            Self::Complete => f.write_str("complete"),
        }
    }
}
