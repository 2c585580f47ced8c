//! Simulated collaborators for `assessment-core`.
//!
//! - [`SimulatedDevice`]: an [`AudioDevice`](assessment_core::AudioDevice)
//!   that writes silent WAV files and plays clips by sleeping.
//! - [`FixedScorer`]: a [`ResultScorer`](assessment_core::ResultScorer)
//!   with canned scores.

pub mod device;
pub mod scorer;
pub mod wav;

pub use device::{SimulatedDevice, SimulatedDeviceConfig};
pub use scorer::FixedScorer;
