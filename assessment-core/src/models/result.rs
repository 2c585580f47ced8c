use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::AssessmentError;
use super::round::RoundKind;

/// Common European Framework of Reference proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn code(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::A1 => "Beginner - Can understand and use familiar everyday expressions",
            Self::A2 => "Elementary - Can communicate in simple and routine tasks",
            Self::B1 => "Intermediate - Can deal with most situations while traveling",
            Self::B2 => "Upper Intermediate - Can interact with fluency and spontaneity",
            Self::C1 => "Advanced - Can use language flexibly and effectively",
            Self::C2 => "Proficient - Can understand virtually everything heard or read",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse banding of a 0–100 score for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Strong,
            60..=79 => Self::Fair,
            _ => Self::Weak,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundScore {
    pub round_index: usize,
    pub kind: RoundKind,
    /// 0–100.
    pub score: u8,
    pub level: CefrLevel,
}

/// Final scoring outcome, produced once by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub overall_level: CefrLevel,
    /// 0–100.
    pub overall_score: u8,
    pub rounds: Vec<RoundScore>,
}

impl ResultSummary {
    pub fn round(&self, kind: RoundKind) -> Option<&RoundScore> {
        self.rounds.iter().find(|r| r.kind == kind)
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.overall_score)
    }

    /// Pretty JSON for handing the summary to a presentation layer.
    pub fn to_json_pretty(&self) -> Result<String, AssessmentError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AssessmentError::Serialization(format!("failed to serialize result: {}", e)))
    }

    /// Parse a summary previously produced by [`to_json_pretty`](Self::to_json_pretty).
    pub fn from_json(json: &str) -> Result<Self, AssessmentError> {
        serde_json::from_str(json)
            .map_err(|e| AssessmentError::Serialization(format!("failed to parse result: {}", e)))
    }
}
