use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capture::CaptureArtifact;
use super::round::{RoundKind, RoundRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// All finalized rounds of one assessment, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    rounds: Vec<RoundRecord>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecord {
    /// A fresh, empty in-progress record.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: SessionStatus::InProgress,
            rounds: Vec::with_capacity(RoundKind::ALL.len()),
        }
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn round(&self, kind: RoundKind) -> Option<&RoundRecord> {
        self.rounds.iter().find(|r| r.kind == kind)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &CaptureArtifact> {
        self.rounds.iter().flat_map(|r| r.artifacts().iter())
    }

    /// All three rounds present, finalized, and fully answered.
    pub fn is_complete(&self) -> bool {
        self.rounds.len() == RoundKind::ALL.len()
            && self
                .rounds
                .iter()
                .zip(RoundKind::ALL)
                .all(|(r, kind)| r.kind == kind && r.is_finalized() && r.is_fully_answered())
    }

    pub(crate) fn push_round(&mut self, round: RoundRecord) {
        self.rounds.push(round);
    }
}
