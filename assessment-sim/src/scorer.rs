use std::sync::atomic::{AtomicUsize, Ordering};

use assessment_core::models::result::{CefrLevel, ResultSummary, RoundScore};
use assessment_core::models::round::RoundKind;
use assessment_core::models::session::SessionRecord;
use assessment_core::traits::result_scorer::ResultScorer;

/// Scorer that returns the same canned result for every session.
///
/// Stands in for the real scoring service in demos and integration tests.
#[derive(Debug)]
pub struct FixedScorer {
    rounds: [(u8, CefrLevel); 3],
    overall_level: CefrLevel,
    calls: AtomicUsize,
}

impl FixedScorer {
    /// `rounds` holds `(score, level)` for each round in order.
    pub fn new(rounds: [(u8, CefrLevel); 3], overall_level: CefrLevel) -> Self {
        Self {
            rounds,
            overall_level,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `score` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResultScorer for FixedScorer {
    fn score(&self, record: &SessionRecord) -> ResultSummary {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Scoring session {} ({} artifacts)",
            record.id,
            record.artifacts().count()
        );

        let rounds: Vec<RoundScore> = RoundKind::ALL
            .iter()
            .zip(self.rounds.iter())
            .map(|(kind, &(score, level))| RoundScore {
                round_index: kind.index(),
                kind: *kind,
                score: score.min(100),
                level,
            })
            .collect();

        let total: u32 = rounds.iter().map(|r| u32::from(r.score)).sum();
        let overall_score = ((total as f64) / (rounds.len() as f64)).round() as u8;

        ResultSummary {
            overall_level: self.overall_level,
            overall_score,
            rounds,
        }
    }
}
