//! # assessment-core
//!
//! Session engine for a three-round spoken language assessment.
//!
//! Selects prompts, sequences record/playback steps against a single audio
//! device, tracks progress, and hands the finished session to a pluggable
//! scorer. Platform audio backends implement the `AudioDevice` trait;
//! presentation layers observe the engine through `AssessmentDelegate`.
//!
//! ## Architecture
//!
//! ```text
//! assessment-core (this crate)
//! ├── traits/    ← AudioDevice, ResultScorer, AssessmentDelegate
//! ├── models/    ← AssessmentError, prompts, capture records, round/session records, results, config
//! ├── prompts/   ← built-in pools, unbiased prompt selection
//! ├── capture/   ← CaptureController (device mutual exclusion, release guarantees)
//! └── session/   ← RoundMachine, AssessmentSession (orchestrator)
//! ```

pub mod capture;
pub mod models;
pub mod prompts;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use capture::controller::CaptureController;
pub use models::capture::{
    CaptureArtifact, CaptureFault, CaptureSession, DeviceActivity, DeviceEvent, PlaybackEvent, PlaybackOutcome,
    PlaybackTicket, RecordedAudio,
};
pub use models::config::{format_elapsed, AssessmentConfiguration, FreeSpeechGuidance, SpeakingHint};
pub use models::error::AssessmentError;
pub use models::prompt::{AudioRef, Prompt, PromptId, PromptPool, PromptSet};
pub use models::result::{CefrLevel, ResultSummary, RoundScore, ScoreBand};
pub use models::round::{RoundKind, RoundRecord};
pub use models::session::{SessionRecord, SessionStatus};
pub use models::state::{CaptureStatus, RoundState};
pub use prompts::selector::select_prompts;
pub use session::orchestrator::{AssessmentSession, SessionBuilder};
pub use session::round::RoundMachine;
pub use traits::assessment_delegate::AssessmentDelegate;
pub use traits::audio_device::{AudioDevice, CaptureFaultCallback, PlaybackCallback};
pub use traits::result_scorer::ResultScorer;
