use crate::models::error::AssessmentError;
use crate::models::result::ResultSummary;
use crate::models::round::RoundRecord;
use crate::models::state::RoundState;

/// Event delegate for session notifications.
///
/// Called on the thread that issued the intent. A presentation layer renders
/// state from these; a navigator maps the completion events to screens.
pub trait AssessmentDelegate: Send + Sync {
    /// Called on every round state entry with the recomputed round progress.
    fn on_round_state_changed(&self, round_index: usize, state: &RoundState, progress: f64);

    /// Called when an intent fails, recoverable or not.
    fn on_error(&self, error: &AssessmentError);

    /// Called once per round, after it is finalized.
    fn on_round_complete(&self, record: &RoundRecord);

    /// Called once, after scoring.
    fn on_session_complete(&self, summary: &ResultSummary);
}
