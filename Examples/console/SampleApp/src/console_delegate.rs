use std::sync::Arc;

use assessment_core::{AssessmentDelegate, AssessmentError, ResultSummary, RoundKind, RoundRecord, RoundState};

/// Delegate that reports engine events through the `log` facade.
pub struct ConsoleDelegate;

impl ConsoleDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl AssessmentDelegate for ConsoleDelegate {
    fn on_round_state_changed(&self, round_index: usize, state: &RoundState, progress: f64) {
        let title = RoundKind::for_index(round_index).map_or("?", |k| k.title());
        log::info!(
            "[round {} {}] {} ({:.0}%)",
            round_index + 1,
            title,
            state,
            progress * 100.0
        );
    }

    fn on_error(&self, error: &AssessmentError) {
        log::warn!("Engine error: {}", error);
    }

    fn on_round_complete(&self, record: &RoundRecord) {
        log::info!(
            "Round {} complete with {} recordings",
            record.round_index + 1,
            record.artifacts().len()
        );
    }

    fn on_session_complete(&self, summary: &ResultSummary) {
        log::info!(
            "Assessment complete: {} ({}/100)",
            summary.overall_level,
            summary.overall_score
        );
    }
}
