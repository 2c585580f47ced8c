//! Minimal WAV writer for simulated recordings.
//!
//! Produces a 44-byte RIFF header followed by 16-bit mono PCM.

use std::time::Duration;

pub const WAV_HEADER_SIZE: usize = 44;

const BIT_DEPTH: u16 = 16;
const CHANNELS: u16 = 1;

/// Build a PCM RIFF header for `data_size` bytes of mono 16-bit audio.
///
/// ```text
/// [0-3]   "RIFF"      [4-7]   36 + data_size
/// [8-11]  "WAVE"      [12-15] "fmt "
/// [16-19] 16          [20-21] 1 (PCM)
/// [22-23] channels    [24-27] sample_rate
/// [28-31] byte_rate   [32-33] block_align
/// [34-35] bit_depth   [36-39] "data"
/// [40-43] data_size
/// ```
pub fn header(sample_rate: u32, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = CHANNELS * BIT_DEPTH / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BIT_DEPTH.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// A complete WAV file of silence lasting `duration`.
pub fn silence(duration: Duration, sample_rate: u32) -> Vec<u8> {
    let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    let data_size = frames * (BIT_DEPTH as usize / 8);

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_size);
    bytes.extend_from_slice(&header(sample_rate, data_size as u32));
    bytes.resize(WAV_HEADER_SIZE + data_size, 0);
    bytes
}
