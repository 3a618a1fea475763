//! Audio output using cpal and a ring buffer
//!
//! The game thread pushes `f32` samples into the ring buffer and the device
//! callback pops them, converting to the device's sample type.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{debug, error, warn};

use super::manager::{AudioHost, DeviceError, PlaybackDevice};
use super::{AudioSpec, SampleFormat};
use crate::handle::{Handle, Resource};

/// Seconds of audio the ring buffer can hold ahead of the device
const RING_BUFFER_SECONDS: usize = 2;

/// Opens playback devices through the platform's default cpal host
#[derive(Debug, Default)]
pub struct CpalHost;

impl CpalHost {
    pub fn new() -> Self {
        Self
    }
}

impl AudioHost for CpalHost {
    fn open_default_playback(&mut self) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| DeviceError::Open("no audio output device available".to_string()))?;

        Ok(Box::new(CpalDevice {
            device,
            stream: Handle::empty(),
            producer: None,
        }))
    }
}

/// A running cpal stream; releasing it pauses playback
struct OutputStream(cpal::Stream);

impl Resource for OutputStream {
    const KIND: &'static str = "audio output stream";
    type Error = cpal::PauseStreamError;

    fn release(self) -> Result<(), Self::Error> {
        self.0.pause()
    }
}

/// The default output device and its bound stream
pub struct CpalDevice {
    device: cpal::Device,
    stream: Handle<OutputStream>,
    producer: Option<ringbuf::HeapProd<f32>>,
}

impl PlaybackDevice for CpalDevice {
    fn name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "unknown device".to_string())
    }

    fn native_spec(&self) -> Result<AudioSpec, DeviceError> {
        let config = self
            .device
            .default_output_config()
            .map_err(|e| DeviceError::Format(e.to_string()))?;

        debug!(sample_format = ?config.sample_format(), "Device sample format");

        // The stream is always fed f32; the callback converts to the device type
        Ok(AudioSpec::new(
            SampleFormat::F32Le,
            config.channels(),
            config.sample_rate().0,
        ))
    }

    fn bind(&mut self, spec: AudioSpec) -> Result<(), DeviceError> {
        if spec.format != SampleFormat::F32Le {
            return Err(DeviceError::Bind(format!(
                "stream must be fed F32LE samples, got {}",
                spec.format
            )));
        }

        let supported = self
            .device
            .default_output_config()
            .map_err(|e| DeviceError::Format(e.to_string()))?;

        let mut config: cpal::StreamConfig = supported.config();
        config.channels = spec.channels;
        config.sample_rate = cpal::SampleRate(spec.freq);

        let capacity = spec.freq as usize * spec.channels as usize * RING_BUFFER_SECONDS;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&self.device, &config, consumer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&self.device, &config, consumer),
            cpal::SampleFormat::U16 => build_stream::<u16>(&self.device, &config, consumer),
            other => {
                return Err(DeviceError::Bind(format!(
                    "unsupported sample format: {other:?}"
                )));
            }
        }
        .map_err(|e| DeviceError::Bind(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DeviceError::Bind(e.to_string()))?;

        debug!("Audio stream started");

        self.stream.reset(Some(OutputStream(stream)));
        self.producer = Some(producer);
        Ok(())
    }

    fn submit(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| DeviceError::Submit("no stream bound".to_string()))?;

        queue_samples(producer, bytes)
    }
}

/// Pushes little-endian `f32` samples into the ring buffer
///
/// Samples that do not fit are dropped and reported as a submit error.
fn queue_samples<P>(producer: &mut P, bytes: &[u8]) -> Result<(), DeviceError>
where
    P: Producer<Item = f32>,
{
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let pushed = producer.push_slice(&samples);
    if pushed < samples.len() {
        let dropped = samples.len() - pushed;
        warn!(dropped, queued = pushed, "Audio buffer overflow, dropping samples");
        return Err(DeviceError::Submit(format!(
            "ring buffer full, dropped {dropped} of {} samples",
            samples.len()
        )));
    }

    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: ringbuf::HeapCons<f32>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = vec![0.0; 4096];

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }

            let popped = consumer.pop_slice(&mut scratch[..data.len()]);
            for (out, &sample) in data.iter_mut().zip(&scratch[..popped]) {
                *out = T::from_sample(sample);
            }

            // Underrun: pad with silence
            for out in &mut data[popped..] {
                *out = T::EQUILIBRIUM;
            }
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )
}
