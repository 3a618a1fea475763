//! Audio data model, format conversion and playback
//!
//! All playable audio is normalized to [`TARGET_AUDIO_SPEC`] when it is loaded,
//! so playback never has to convert.

pub mod convert;
pub mod cpal_backend;
pub mod manager;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub use convert::{ConversionStream, resample_if_needed};
pub use manager::{AudioHost, AudioManager, DeviceError, PlaybackDevice};

/// The single spec every playable buffer is converted to
pub const TARGET_AUDIO_SPEC: AudioSpec = AudioSpec {
    format: SampleFormat::F32Le,
    channels: 2,
    freq: 44_100,
};

/// Errors raised while converting audio between specs
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("invalid audio spec {0}: channels and frequency must be non-zero")]
    InvalidSpec(AudioSpec),
}

/// Encoding of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S8,
    S16Le,
    S16Be,
    S32Le,
    S32Be,
    F32Le,
    F32Be,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::S16Le | SampleFormat::S16Be => 2,
            SampleFormat::S32Le
            | SampleFormat::S32Be
            | SampleFormat::F32Le
            | SampleFormat::F32Be => 4,
        }
    }

    /// Human readable name used in log lines
    pub const fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "U8",
            SampleFormat::S8 => "S8",
            SampleFormat::S16Le => "S16LE",
            SampleFormat::S16Be => "S16BE",
            SampleFormat::S32Le => "S32LE",
            SampleFormat::S32Be => "S32BE",
            SampleFormat::F32Le => "F32LE",
            SampleFormat::F32Be => "F32BE",
        }
    }

    /// Decodes one sample into the range [-1.0, 1.0]
    ///
    /// `bytes` must hold exactly [`Self::bytes_per_sample`] bytes.
    pub fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            SampleFormat::U8 => (bytes[0] as f32 - 128.0) / 128.0,
            SampleFormat::S8 => bytes[0] as i8 as f32 / 128.0,
            SampleFormat::S16Le => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32_768.0,
            SampleFormat::S16Be => i16::from_be_bytes([bytes[0], bytes[1]]) as f32 / 32_768.0,
            SampleFormat::S32Le => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32
                    / 2_147_483_648.0
            }
            SampleFormat::S32Be => {
                i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32
                    / 2_147_483_648.0
            }
            SampleFormat::F32Le => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            SampleFormat::F32Be => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Encodes one sample, clamping integer formats to their range
    pub fn encode(self, sample: f32, out: &mut Vec<u8>) {
        let clamped = sample.clamp(-1.0, 1.0);
        match self {
            SampleFormat::U8 => out.push((clamped * 127.0 + 128.0).round() as u8),
            SampleFormat::S8 => out.push((clamped * 127.0).round() as i8 as u8),
            SampleFormat::S16Le => {
                out.extend_from_slice(&((clamped * 32_767.0).round() as i16).to_le_bytes())
            }
            SampleFormat::S16Be => {
                out.extend_from_slice(&((clamped * 32_767.0).round() as i16).to_be_bytes())
            }
            SampleFormat::S32Le => out
                .extend_from_slice(&((clamped as f64 * 2_147_483_647.0).round() as i32).to_le_bytes()),
            SampleFormat::S32Be => out
                .extend_from_slice(&((clamped as f64 * 2_147_483_647.0).round() as i32).to_be_bytes()),
            SampleFormat::F32Le => out.extend_from_slice(&sample.to_le_bytes()),
            SampleFormat::F32Be => out.extend_from_slice(&sample.to_be_bytes()),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoding, channel count and sample rate of a stream of audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    pub format: SampleFormat,
    pub channels: u16,
    pub freq: u32,
}

impl AudioSpec {
    pub const fn new(format: SampleFormat, channels: u16, freq: u32) -> Self {
        Self {
            format,
            channels,
            freq,
        }
    }

    /// Size of one frame (one sample per channel) in bytes
    pub const fn frame_size(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    pub const fn is_valid(&self) -> bool {
        self.channels > 0 && self.freq > 0
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "format = {}, channels = {}, freq = {}",
            self.format, self.channels, self.freq
        )
    }
}

/// Decoded audio bytes tagged with their spec
#[derive(Clone, PartialEq)]
pub struct AudioBuffer {
    spec: AudioSpec,
    data: Vec<u8>,
}

impl AudioBuffer {
    /// Creates a buffer, discarding any trailing partial frame
    pub fn new(spec: AudioSpec, mut data: Vec<u8>) -> Self {
        let frame_size = spec.frame_size().max(1);
        data.truncate(data.len() - data.len() % frame_size);
        Self { spec, data }
    }

    pub fn spec(&self) -> &AudioSpec {
        &self.spec
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole frames in the buffer
    pub fn frames(&self) -> usize {
        self.data.len() / self.spec.frame_size().max(1)
    }

    /// Playback length at the buffer's sample rate
    pub fn duration(&self) -> Duration {
        if self.spec.freq == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.spec.freq as f64)
    }

    /// Replaces the contents with converted bytes in a new spec
    pub(crate) fn replace(&mut self, spec: AudioSpec, data: Vec<u8>) {
        *self = Self::new(spec, data);
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("spec", &self.spec)
            .field("size_in_bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(TARGET_AUDIO_SPEC.frame_size(), 8);
        assert_eq!(AudioSpec::new(SampleFormat::S16Le, 1, 22_050).frame_size(), 2);
        assert_eq!(AudioSpec::new(SampleFormat::U8, 6, 8_000).frame_size(), 6);
    }

    #[test]
    fn test_buffer_drops_partial_frame() {
        let spec = AudioSpec::new(SampleFormat::S16Le, 2, 44_100);
        let buffer = AudioBuffer::new(spec, vec![0; 11]);
        assert_eq!(buffer.size_in_bytes(), 8);
        assert_eq!(buffer.frames(), 2);
    }

    #[test]
    fn test_buffer_duration() {
        let spec = AudioSpec::new(SampleFormat::S16Le, 1, 1_000);
        let buffer = AudioBuffer::new(spec, vec![0; 1_000]);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_sample_decode_midpoints() {
        assert_eq!(SampleFormat::U8.decode(&[128]), 0.0);
        assert_eq!(SampleFormat::S8.decode(&[0]), 0.0);
        assert_eq!(SampleFormat::S16Le.decode(&[0x00, 0x80]), -1.0);
        assert_eq!(SampleFormat::S16Be.decode(&[0x80, 0x00]), -1.0);
        assert_eq!(SampleFormat::F32Le.decode(&0.25f32.to_le_bytes()), 0.25);
    }

    #[test]
    fn test_sample_encode_clamps() {
        let mut out = Vec::new();
        SampleFormat::S16Le.encode(2.0, &mut out);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), i16::MAX);

        out.clear();
        SampleFormat::U8.encode(-1.0, &mut out);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn test_spec_display_uses_format_name() {
        let text = TARGET_AUDIO_SPEC.to_string();
        assert_eq!(text, "format = F32LE, channels = 2, freq = 44100");
    }
}
