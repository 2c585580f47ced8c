use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::error::AssessmentError;
use crate::models::prompt::{PromptPool, PromptSet};

/// Pick `count` distinct prompts from `pool` in random order.
///
/// Shuffles a copy with Fisher–Yates and keeps the first `count` entries.
/// The pool itself is never modified, so repeated calls see the full pool.
pub fn select_prompts<R>(pool: &PromptPool, count: usize, rng: &mut R) -> Result<PromptSet, AssessmentError>
where
    R: Rng + ?Sized,
{
    if count > pool.len() {
        return Err(AssessmentError::InsufficientPoolSize {
            requested: count,
            available: pool.len(),
        });
    }

    let mut candidates = pool.prompts().to_vec();
    candidates.shuffle(rng);
    candidates.truncate(count);
    Ok(PromptSet::from_selection(candidates))
}
