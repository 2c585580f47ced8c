mod console_delegate;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;

use assessment_core::{
    AssessmentConfiguration, AssessmentError, AssessmentSession, CaptureArtifact, CaptureController, CefrLevel,
    ResultSummary, RoundState, SessionStatus,
};
use assessment_sim::{FixedScorer, SimulatedDevice, SimulatedDeviceConfig};

use console_delegate::ConsoleDelegate;

const MAX_ATTEMPTS: usize = 3;

/// Runs a scripted speaking assessment against the simulated device.
#[derive(Debug, Parser)]
#[command(name = "sample-app", version)]
struct Args {
    /// Directory for recorded responses.
    #[arg(long, default_value = "recordings")]
    output_dir: PathBuf,

    /// Seed for prompt selection. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// How long each simulated answer lasts, in milliseconds.
    #[arg(long, default_value_t = 300)]
    speak_ms: u64,

    /// Playback length of listen-and-repeat clips, in milliseconds.
    #[arg(long, default_value_t = 400)]
    clip_ms: u64,

    /// Require an explicit advance after each answer.
    #[arg(long)]
    manual_advance: bool,

    /// Deny microphone permission to exercise the error path.
    #[arg(long)]
    deny_permission: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    session_id: String,
    result: &'a ResultSummary,
    artifacts: Vec<&'a CaptureArtifact>,
}

type Session = AssessmentSession<SimulatedDevice, FixedScorer>;

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("Assessment failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AssessmentError> {
    let device = SimulatedDevice::new(SimulatedDeviceConfig {
        output_directory: args.output_dir.clone(),
        grant_permission: !args.deny_permission,
        default_clip_ms: args.clip_ms,
        ..Default::default()
    });
    let scorer = FixedScorer::new(
        [(82, CefrLevel::B2), (75, CefrLevel::B1), (77, CefrLevel::B1)],
        CefrLevel::B1,
    );
    let config = AssessmentConfiguration {
        auto_advance: !args.manual_advance,
        ..Default::default()
    };

    let mut builder = AssessmentSession::builder(CaptureController::new(device), scorer)
        .config(config)
        .delegate(ConsoleDelegate::new());
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let mut session = builder.start()?;

    while session.status() != SessionStatus::Completed {
        answer_current_prompt(&mut session, args)?;
    }

    let result = session.result()?;
    let report = RunReport {
        session_id: session.id().to_string(),
        result,
        artifacts: session.record().artifacts().collect(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| AssessmentError::Serialization(format!("failed to encode report: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn answer_current_prompt(session: &mut Session, args: &Args) -> Result<(), AssessmentError> {
    if let Some(prompt) = session.current_prompt() {
        let (n, m) = session.round_position().unwrap_or((0, 0));
        let text = prompt.text().unwrap_or("(audio clip)");
        log::info!("Question {} of {} [{}]: {}", n, m, prompt.id(), text);
    }

    let playback_timeout = Duration::from_millis(args.clip_ms * 10 + 1000);
    match session.round_state() {
        Some(RoundState::AwaitingPrompt { .. }) => {
            let needs_playback = session
                .current_round_kind()
                .is_some_and(|kind| kind.requires_playback());
            with_retries(session, |session| {
                if needs_playback {
                    session.play_prompt()?;
                    wait_until_played(session, playback_timeout)
                } else {
                    session.start_capture()
                }
            })?;
        }
        Some(RoundState::Capturing { .. }) => {
            thread::sleep(Duration::from_millis(args.speak_ms));
            if let Some((elapsed, hint)) = session.free_speech_hint() {
                log::info!("{} {}", assessment_core::format_elapsed(elapsed), hint.message());
            }
            // A microphone fault puts the round back to its prompt; the next
            // pass starts the answer again.
            match session.poll_device_events() {
                Err(e) if e.is_recoverable() => {
                    log::warn!("Recording lost ({}), asking again", e);
                    return Ok(());
                }
                other => {
                    other?;
                }
            }
            session.stop_capture()?;
        }
        Some(RoundState::Reviewing { .. }) => session.advance()?,
        Some(RoundState::Playing { .. }) => wait_until_played(session, playback_timeout)?,
        Some(RoundState::Complete) | None => {}
    }
    Ok(())
}

/// Apply device events until the round leaves `Playing` or `timeout` passes.
fn wait_until_played(session: &mut Session, timeout: Duration) -> Result<(), AssessmentError> {
    let deadline = Instant::now() + timeout;
    while matches!(session.round_state(), Some(RoundState::Playing { .. })) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            session.abandon();
            return Err(AssessmentError::DeviceError("playback did not finish".into()));
        }
        // Stale events return false; keep waiting for the current one.
        session.wait_for_playback(remaining)?;
    }
    Ok(())
}

/// Retry recoverable failures, cancelling any half-started capture or
/// playback before the next attempt.
fn with_retries(
    session: &mut Session,
    mut attempt: impl FnMut(&mut Session) -> Result<(), AssessmentError>,
) -> Result<(), AssessmentError> {
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt(session) {
            Err(e) if e.is_recoverable() && tries < MAX_ATTEMPTS => {
                if session.abandon() {
                    log::debug!("Cancelled in-flight device activity before retrying");
                }
                log::warn!("Attempt {} failed ({}), retrying", tries, e);
                thread::sleep(Duration::from_millis(100));
            }
            other => return other,
        }
    }
}
