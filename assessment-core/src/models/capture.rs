use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::prompt::PromptId;
use super::state::CaptureStatus;

/// One in-progress (or just finished) recording attempt.
///
/// Returned by value from the controller as a handle; the controller keeps
/// its own copy and is the authority on status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: Uuid,
    pub prompt_id: PromptId,
    pub round_index: usize,
    pub started_at: DateTime<Utc>,
    pub status: CaptureStatus,
}

/// What a backend hands back when a recording stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    pub location: PathBuf,
    /// Backend-measured length; the controller's wall clock is used when absent.
    pub duration: Option<Duration>,
    pub checksum: Option<String>,
}

/// Durable output of a finished capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArtifact {
    pub id: Uuid,
    pub prompt_id: PromptId,
    pub round_index: usize,
    pub location: PathBuf,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
    pub checksum: Option<String>,
}

impl CaptureArtifact {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Identifies one playback so late completion events can be matched or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackTicket(Uuid);

impl PlaybackTicket {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// How a playback ended, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Failed(String),
}

/// Playback completion routed from the device thread back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub ticket: PlaybackTicket,
    pub outcome: PlaybackOutcome,
}

/// A recording that failed on the device after it started, e.g. because the
/// microphone was unplugged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFault {
    pub session_id: Uuid,
    pub message: String,
}

/// Asynchronous report from the device, queued by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Playback(PlaybackEvent),
    CaptureFault(CaptureFault),
}

/// What the shared device is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceActivity {
    Idle,
    Recording { session_id: Uuid },
    Playing { ticket: PlaybackTicket },
}

impl DeviceActivity {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
