use crate::models::result::ResultSummary;
use crate::models::session::SessionRecord;

/// Turns a completed session's recordings into scores.
///
/// The engine only calls this with a complete record: three finalized rounds,
/// one artifact per prompt.
pub trait ResultScorer: Send + Sync {
    fn score(&self, record: &SessionRecord) -> ResultSummary;
}

impl<T: ResultScorer + ?Sized> ResultScorer for std::sync::Arc<T> {
    fn score(&self, record: &SessionRecord) -> ResultSummary {
        (**self).score(record)
    }
}

impl<T: ResultScorer + ?Sized> ResultScorer for Box<T> {
    fn score(&self, record: &SessionRecord) -> ResultSummary {
        (**self).score(record)
    }
}
