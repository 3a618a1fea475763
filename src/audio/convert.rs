//! Streaming sample format, channel and rate conversion
//!
//! [`ConversionStream`] follows a push/flush/pull protocol. A resampler may need
//! several input frames before it can emit one output frame (or the reverse),
//! so the exact output size is only known once the stream has been flushed.

use std::collections::VecDeque;

use tracing::debug;

use super::{AudioBuffer, AudioError, AudioSpec};

/// Converts audio from one [`AudioSpec`] to another
#[derive(Debug)]
pub struct ConversionStream {
    src: AudioSpec,
    dst: AudioSpec,
    /// Bytes of a source frame that has not fully arrived yet
    partial: Vec<u8>,
    /// Channel-mapped frames waiting to be resampled, interleaved
    pending: Vec<f32>,
    /// Frame in `pending` the next output frame starts from
    index: usize,
    /// Distance past `index`, in units of 1 / dst.freq
    frac: u64,
    output: VecDeque<u8>,
}

impl ConversionStream {
    /// Creates a stream converting `src` audio into `dst` audio
    pub fn new(src: AudioSpec, dst: AudioSpec) -> Result<Self, AudioError> {
        for spec in [src, dst] {
            if !spec.is_valid() {
                return Err(AudioError::InvalidSpec(spec));
            }
        }

        Ok(Self {
            src,
            dst,
            partial: Vec::new(),
            pending: Vec::new(),
            index: 0,
            frac: 0,
            output: VecDeque::new(),
        })
    }

    pub fn src_spec(&self) -> &AudioSpec {
        &self.src
    }

    pub fn dst_spec(&self) -> &AudioSpec {
        &self.dst
    }

    /// Pushes source bytes into the stream
    ///
    /// Bytes that do not complete a frame are held until more data arrives.
    pub fn put(&mut self, bytes: &[u8]) {
        let format = self.src.format;
        let sample_size = format.bytes_per_sample();
        let frame_size = self.src.frame_size();
        let dst_channels = self.dst.channels as usize;

        self.partial.extend_from_slice(bytes);
        let whole = self.partial.len() - self.partial.len() % frame_size;

        let mut frame = Vec::with_capacity(self.src.channels as usize);
        for chunk in self.partial[..whole].chunks_exact(frame_size) {
            frame.clear();
            frame.extend(chunk.chunks_exact(sample_size).map(|s| format.decode(s)));
            remap_channels(&frame, dst_channels, &mut self.pending);
        }
        self.partial.drain(..whole);

        self.resample(false);
    }

    /// Signals the end of input so buffered lookahead is converted
    pub fn flush(&mut self) {
        if !self.partial.is_empty() {
            debug!(
                bytes = self.partial.len(),
                "Dropping incomplete frame at end of conversion input"
            );
            self.partial.clear();
        }

        self.resample(true);
    }

    /// Number of converted bytes ready to be read
    pub fn available(&self) -> usize {
        self.output.len()
    }

    /// Reads converted bytes into `out`, returning how many were written
    pub fn get(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.output.len());
        for (slot, byte) in out.iter_mut().zip(self.output.drain(..count)) {
            *slot = byte;
        }
        count
    }

    /// Discards all buffered input and output
    pub fn clear(&mut self) {
        self.partial.clear();
        self.pending.clear();
        self.index = 0;
        self.frac = 0;
        self.output.clear();
    }

    fn resample(&mut self, final_pass: bool) {
        let channels = self.dst.channels as usize;
        let frames = self.pending.len() / channels;
        let step = self.src.freq as u64;
        let denom = self.dst.freq as u64;

        let mut encoded = Vec::new();
        loop {
            let has_next = self.index + 1 < frames;
            if !has_next && !(final_pass && self.index < frames) {
                break;
            }

            let t = self.frac as f32 / denom as f32;
            let next = if has_next { self.index + 1 } else { self.index };
            for c in 0..channels {
                let a = self.pending[self.index * channels + c];
                let b = self.pending[next * channels + c];
                self.dst.format.encode(a + (b - a) * t, &mut encoded);
            }

            self.frac += step;
            self.index += (self.frac / denom) as usize;
            self.frac %= denom;
        }
        self.output.extend(encoded);

        if final_pass {
            self.pending.clear();
            self.index = 0;
            self.frac = 0;
        } else {
            let consumed = self.index.min(frames);
            self.pending.drain(..consumed * channels);
            self.index -= consumed;
        }
    }
}

/// Maps one decoded frame onto `dst_channels` channels
///
/// Mono fans out to every channel, anything folded into mono is averaged, and
/// other layouts copy matching channels and silence the rest.
fn remap_channels(frame: &[f32], dst_channels: usize, out: &mut Vec<f32>) {
    let src_channels = frame.len();

    if src_channels == dst_channels {
        out.extend_from_slice(frame);
    } else if src_channels == 1 {
        out.extend(std::iter::repeat_n(frame[0], dst_channels));
    } else if dst_channels == 1 {
        out.push(frame.iter().sum::<f32>() / src_channels as f32);
    } else {
        out.extend((0..dst_channels).map(|c| frame.get(c).copied().unwrap_or(0.0)));
    }
}

/// Converts `buffer` to `target` unless it already matches
///
/// Calling this again with the same target is a no-op.
pub fn resample_if_needed(
    mut buffer: AudioBuffer,
    target: &AudioSpec,
) -> Result<AudioBuffer, AudioError> {
    if buffer.spec() == target {
        return Ok(buffer);
    }

    debug!(
        from.format = %buffer.spec().format,
        from.channels = buffer.spec().channels,
        from.freq = buffer.spec().freq,
        to.format = %target.format,
        to.channels = target.channels,
        to.freq = target.freq,
        "Resampling audio buffer"
    );

    let mut stream = ConversionStream::new(*buffer.spec(), *target)?;
    stream.put(buffer.data());
    stream.flush();

    let mut converted = vec![0; stream.available()];
    let read = stream.get(&mut converted);
    converted.truncate(read);

    buffer.replace(*target, converted);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SampleFormat, TARGET_AUDIO_SPEC};

    fn s16_mono(freq: u32) -> AudioSpec {
        AudioSpec::new(SampleFormat::S16Le, 1, freq)
    }

    fn s16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn f32_samples(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn drain(stream: &mut ConversionStream) -> Vec<u8> {
        let mut out = vec![0; stream.available()];
        let read = stream.get(&mut out);
        out.truncate(read);
        out
    }

    #[test]
    fn test_rejects_invalid_spec() {
        let bad = AudioSpec::new(SampleFormat::S16Le, 0, 44_100);
        assert!(ConversionStream::new(bad, TARGET_AUDIO_SPEC).is_err());

        let bad = AudioSpec::new(SampleFormat::S16Le, 2, 0);
        assert!(ConversionStream::new(TARGET_AUDIO_SPEC, bad).is_err());
    }

    #[test]
    fn test_same_rate_holds_last_frame_until_flush() {
        let spec = s16_mono(8_000);
        let mut stream = ConversionStream::new(spec, spec).unwrap();

        stream.put(&s16_bytes(&[1, 2, 3]));
        assert_eq!(stream.available(), 4);

        stream.flush();
        assert_eq!(drain(&mut stream), s16_bytes(&[1, 2, 3]));
    }

    #[test]
    fn test_upsample_mono_to_stereo_float() {
        let src = s16_mono(22_050);
        let mut stream = ConversionStream::new(src, TARGET_AUDIO_SPEC).unwrap();

        stream.put(&s16_bytes(&[0, 16_384]));
        stream.flush();

        let samples = f32_samples(&drain(&mut stream));
        // Two source frames at double rate, fanned out to two channels
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] - 0.25).abs() < 1e-6);
        assert!((samples[3] - 0.25).abs() < 1e-6);
        assert!((samples[4] - 0.5).abs() < 1e-6);
        assert!((samples[6] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_halves_frame_count() {
        let src = s16_mono(44_100);
        let dst = s16_mono(22_050);
        let mut stream = ConversionStream::new(src, dst).unwrap();

        stream.put(&s16_bytes(&[10, 20, 30, 40, 50, 60]));
        stream.flush();

        assert_eq!(drain(&mut stream), s16_bytes(&[10, 30, 50]));
    }

    #[test]
    fn test_chunked_input_matches_single_push() {
        let src = AudioSpec::new(SampleFormat::S16Le, 2, 32_000);
        let samples: Vec<i16> = (0..200).map(|i| (i * 97 % 4000) as i16).collect();
        let bytes = s16_bytes(&samples);

        let mut whole = ConversionStream::new(src, TARGET_AUDIO_SPEC).unwrap();
        whole.put(&bytes);
        whole.flush();

        // Odd chunk sizes split frames and samples across pushes
        let mut chunked = ConversionStream::new(src, TARGET_AUDIO_SPEC).unwrap();
        for chunk in bytes.chunks(7) {
            chunked.put(chunk);
        }
        chunked.flush();

        assert_eq!(drain(&mut whole), drain(&mut chunked));
    }

    #[test]
    fn test_stereo_folds_to_mono_average() {
        let src = AudioSpec::new(SampleFormat::F32Le, 2, 48_000);
        let dst = AudioSpec::new(SampleFormat::F32Le, 1, 48_000);
        let mut stream = ConversionStream::new(src, dst).unwrap();

        let bytes: Vec<u8> = [0.5f32, -0.25].iter().flat_map(|s| s.to_le_bytes()).collect();
        stream.put(&bytes);
        stream.flush();

        assert_eq!(f32_samples(&drain(&mut stream)), vec![0.125]);
    }

    #[test]
    fn test_flush_drops_incomplete_frame() {
        let spec = s16_mono(8_000);
        let mut stream = ConversionStream::new(spec, spec).unwrap();

        stream.put(&[1, 0, 7]);
        stream.flush();

        assert_eq!(drain(&mut stream), vec![1, 0]);
    }

    #[test]
    fn test_partial_get_leaves_remainder() {
        let spec = s16_mono(8_000);
        let mut stream = ConversionStream::new(spec, spec).unwrap();
        stream.put(&s16_bytes(&[1, 2, 3]));
        stream.flush();

        let mut first = [0u8; 2];
        assert_eq!(stream.get(&mut first), 2);
        assert_eq!(stream.available(), 4);

        stream.clear();
        assert_eq!(stream.available(), 0);
    }

    #[test]
    fn test_resample_matching_spec_is_untouched() {
        let buffer = AudioBuffer::new(TARGET_AUDIO_SPEC, vec![0; 16]);
        let result = resample_if_needed(buffer.clone(), &TARGET_AUDIO_SPEC).unwrap();
        assert_eq!(result, buffer);
    }

    #[test]
    fn test_resample_is_idempotent() {
        let source = AudioBuffer::new(s16_mono(22_050), s16_bytes(&[0, 100, -100, 2000]));

        let once = resample_if_needed(source, &TARGET_AUDIO_SPEC).unwrap();
        let twice = resample_if_needed(once.clone(), &TARGET_AUDIO_SPEC).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_resample_22050_mono_s16_to_target() {
        let samples: Vec<i16> = (0..441).map(|i| ((i as f32 * 0.1).sin() * 8000.0) as i16).collect();
        let source = AudioBuffer::new(s16_mono(22_050), s16_bytes(&samples));

        let converted = resample_if_needed(source, &TARGET_AUDIO_SPEC).unwrap();

        assert_eq!(converted.spec(), &TARGET_AUDIO_SPEC);
        assert!(converted.size_in_bytes() > 0);
        assert_eq!(converted.frames(), 882);
    }
}
