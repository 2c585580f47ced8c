use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::AssessmentError;

/// Stable identifier of a prompt within its pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(String);

impl PromptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a bundled audio clip played before a listen-and-repeat capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub location: PathBuf,
    /// Clip length when known ahead of playback.
    pub duration_ms: Option<u64>,
}

impl AudioRef {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// A single stimulus requiring one captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prompt {
    /// A sentence the user reads aloud.
    Sentence { id: PromptId, text: String },
    /// A clip the user listens to, then repeats.
    AudioClip { id: PromptId, clip: AudioRef },
    /// An open topic for free speech.
    Topic { id: PromptId, text: String },
}

impl Prompt {
    pub fn sentence(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Sentence {
            id: PromptId::new(id),
            text: text.into(),
        }
    }

    pub fn audio_clip(id: impl Into<String>, clip: AudioRef) -> Self {
        Self::AudioClip {
            id: PromptId::new(id),
            clip,
        }
    }

    pub fn topic(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Topic {
            id: PromptId::new(id),
            text: text.into(),
        }
    }

    pub fn id(&self) -> &PromptId {
        match self {
            Self::Sentence { id, .. } | Self::AudioClip { id, .. } | Self::Topic { id, .. } => id,
        }
    }

    /// Text shown to the user, if this prompt has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Sentence { text, .. } | Self::Topic { text, .. } => Some(text),
            Self::AudioClip { .. } => None,
        }
    }

    pub fn clip(&self) -> Option<&AudioRef> {
        match self {
            Self::AudioClip { clip, .. } => Some(clip),
            _ => None,
        }
    }
}

/// Immutable pool of prompts for one round type.
///
/// Cloning is cheap; clones share the same backing slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPool {
    prompts: Arc<[Prompt]>,
}

impl PromptPool {
    /// Build a pool, rejecting empty input and duplicate ids.
    pub fn new(prompts: Vec<Prompt>) -> Result<Self, AssessmentError> {
        if prompts.is_empty() {
            return Err(AssessmentError::InvalidConfiguration(
                "prompt pool is empty".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(prompts.len());
        for prompt in &prompts {
            if !seen.insert(prompt.id()) {
                return Err(AssessmentError::InvalidConfiguration(format!(
                    "duplicate prompt id in pool: {}",
                    prompt.id()
                )));
            }
        }
        Ok(Self {
            prompts: prompts.into(),
        })
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn contains(&self, id: &PromptId) -> bool {
        self.prompts.iter().any(|p| p.id() == id)
    }

    /// The 20 bundled reading sentences.
    pub fn builtin_sentences() -> Self {
        crate::prompts::builtin::sentences()
    }

    /// The 14 bundled listen-and-repeat clips.
    pub fn builtin_audio_clips() -> Self {
        crate::prompts::builtin::audio_clips()
    }

    /// The 5 bundled free-speech topics.
    pub fn builtin_topics() -> Self {
        crate::prompts::builtin::topics()
    }
}

/// Ordered prompts chosen for one round. Selection order is presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    prompts: Vec<Prompt>,
}

impl PromptSet {
    pub(crate) fn from_selection(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    pub fn get(&self, index: usize) -> Option<&Prompt> {
        self.prompts.get(index)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.iter()
    }

    pub fn ids(&self) -> Vec<PromptId> {
        self.prompts.iter().map(|p| p.id().clone()).collect()
    }
}
