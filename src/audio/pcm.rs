use base64::engine::general_purpose;
use base64::Engine as _;
use byteorder::{ByteOrder, LittleEndian};
use std::time::Duration;

use super::AudioError;

/// Sample rate of the speech returned for audio guides
pub const GUIDE_SAMPLE_RATE: u32 = 24000;
/// Audio guides are mono
pub const GUIDE_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

/// Decoded audio, one buffer of normalized samples per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Interleave frames `start..end` into `out`, clearing it first
    pub fn interleave_into(&self, start: usize, end: usize, out: &mut Vec<f32>) {
        out.clear();
        let end = end.min(self.frame_count());
        for i in start..end {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
    }
}

/// Decode a base64 string into raw bytes
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, AudioError> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AudioError::Decode(format!("invalid base64 audio payload: {}", e)))
}

/// Decode raw signed 16-bit little-endian PCM into normalized channel buffers
///
/// There is no header; the caller guarantees the rate and channel count.
pub fn decode_pcm(data: &[u8], sample_rate: u32, num_channels: u16) -> Result<AudioBuffer, AudioError> {
    if num_channels == 0 {
        return Err(AudioError::Decode("channel count must be at least 1".to_string()));
    }
    if sample_rate == 0 {
        return Err(AudioError::Decode("sample rate must be positive".to_string()));
    }

    let frame_bytes = BYTES_PER_SAMPLE * num_channels as usize;
    if data.len() % frame_bytes != 0 {
        return Err(AudioError::Decode(format!(
            "{} bytes is not a whole number of {}-byte frames",
            data.len(),
            frame_bytes
        )));
    }

    let mut raw = vec![0i16; data.len() / BYTES_PER_SAMPLE];
    LittleEndian::read_i16_into(data, &mut raw);

    let num_channels = num_channels as usize;
    let frame_count = raw.len() / num_channels;
    let channels = (0..num_channels)
        .map(|c| {
            (0..frame_count)
                .map(|i| raw[i * num_channels + c] as f32 / 32768.0)
                .collect()
        })
        .collect();

    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}

/// Decode a base64-wrapped PCM stream
pub fn load(encoded: &str, sample_rate: u32, num_channels: u16) -> Result<AudioBuffer, AudioError> {
    let bytes = decode_base64(encoded)?;
    decode_pcm(&bytes, sample_rate, num_channels)
}

/// Convert a normalized sample back to 16-bit PCM
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}
