//! Simulated audio device.
//!
//! Records by measuring wall-clock time and writing that much silence to a
//! WAV file; plays clips by sleeping for the clip length on a worker thread.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use assessment_core::models::capture::{PlaybackOutcome, RecordedAudio};
use assessment_core::models::error::AssessmentError;
use assessment_core::models::prompt::{AudioRef, PromptId};
use assessment_core::traits::audio_device::{AudioDevice, CaptureFaultCallback, PlaybackCallback};

use crate::wav;

/// Configuration for a [`SimulatedDevice`].
#[derive(Debug, Clone)]
pub struct SimulatedDeviceConfig {
    /// Directory where response files are written.
    pub output_directory: PathBuf,

    /// Sample rate of the written WAV files (default: 16000).
    pub sample_rate: u32,

    /// Answer given to permission requests (default: true).
    pub grant_permission: bool,

    /// Playback length for clips without a known duration (default: 1500 ms).
    pub default_clip_ms: u64,
}

impl Default for SimulatedDeviceConfig {
    fn default() -> Self {
        Self {
            output_directory: std::env::temp_dir().join("assessment-recordings"),
            sample_rate: 16000,
            grant_permission: true,
            default_clip_ms: 1500,
        }
    }
}

struct ActiveRecording {
    prompt: PromptId,
    started: Instant,
}

/// `AudioDevice` backed by the filesystem and a sleeping playback thread.
pub struct SimulatedDevice {
    config: SimulatedDeviceConfig,
    recording: Option<ActiveRecording>,
    playing: Arc<AtomicBool>,
    playback_handle: Option<thread::JoinHandle<()>>,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedDeviceConfig) -> Self {
        Self {
            config,
            recording: None,
            playing: Arc::new(AtomicBool::new(false)),
            playback_handle: None,
        }
    }

    pub fn config(&self) -> &SimulatedDeviceConfig {
        &self.config
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn join_playback(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.playback_handle.take() {
            if handle.join().is_err() {
                log::error!("Simulated playback thread panicked");
            }
        }
    }

    fn write_response(&self, prompt: &PromptId, duration: Duration) -> Result<RecordedAudio, AssessmentError> {
        fs::create_dir_all(&self.config.output_directory)
            .map_err(|e| AssessmentError::DeviceError(format!("failed to create directory: {}", e)))?;

        let file_name = format!("response_{}_{}.wav", prompt, uuid::Uuid::new_v4());
        let location = self.config.output_directory.join(file_name);
        let bytes = wav::silence(duration, self.config.sample_rate);
        fs::write(&location, &bytes)
            .map_err(|e| AssessmentError::DeviceError(format!("failed to write recording: {}", e)))?;

        Ok(RecordedAudio {
            location,
            duration: Some(duration),
            checksum: Some(hex_encode(&Sha256::digest(&bytes))),
        })
    }
}

impl AudioDevice for SimulatedDevice {
    fn request_permission(&mut self) -> Result<bool, AssessmentError> {
        Ok(self.config.grant_permission)
    }

    // The simulated microphone cannot be unplugged, so `_on_fault` never fires.
    fn start_recording(&mut self, prompt: &PromptId, _on_fault: CaptureFaultCallback) -> Result<(), AssessmentError> {
        if self.recording.is_some() || self.is_playing() {
            return Err(AssessmentError::DeviceBusy);
        }
        self.recording = Some(ActiveRecording {
            prompt: prompt.clone(),
            started: Instant::now(),
        });
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<RecordedAudio, AssessmentError> {
        let active = self.recording.take().ok_or(AssessmentError::NoActiveCapture)?;
        let recorded = self.write_response(&active.prompt, active.started.elapsed())?;
        log::debug!("Simulated recording written to {}", recorded.location.display());
        Ok(recorded)
    }

    fn discard_recording(&mut self) -> Result<(), AssessmentError> {
        self.recording = None;
        Ok(())
    }

    fn start_playback(&mut self, clip: &AudioRef, on_finished: PlaybackCallback) -> Result<(), AssessmentError> {
        if self.recording.is_some() || self.is_playing() {
            return Err(AssessmentError::DeviceBusy);
        }
        // Reap a playback thread that already finished on its own.
        self.join_playback();

        let playing = Arc::new(AtomicBool::new(true));
        self.playing = Arc::clone(&playing);
        let length = Duration::from_millis(clip.duration_ms.unwrap_or(self.config.default_clip_ms));
        let name = clip.location.display().to_string();

        let handle = thread::Builder::new()
            .name("sim-playback".into())
            .spawn(move || {
                let deadline = Instant::now() + length;
                while Instant::now() < deadline {
                    if !playing.load(Ordering::SeqCst) {
                        log::debug!("Simulated playback of {} cancelled", name);
                        return;
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                // The device is free again before the owner hears about it.
                if playing.swap(false, Ordering::SeqCst) {
                    on_finished(PlaybackOutcome::Finished);
                }
            })
            .map_err(|e| {
                self.playing.store(false, Ordering::SeqCst);
                AssessmentError::DeviceError(format!("failed to spawn playback thread: {}", e))
            })?;

        self.playback_handle = Some(handle);
        Ok(())
    }

    fn stop_playback(&mut self) -> Result<(), AssessmentError> {
        self.join_playback();
        Ok(())
    }

    fn release(&mut self) {
        self.recording = None;
        self.join_playback();
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.release();
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
