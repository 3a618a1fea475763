//! Playback of pre-normalized audio buffers on the default output device

use thiserror::Error;
use tracing::{debug, error, info};

use super::{AudioBuffer, AudioSpec, ConversionStream, TARGET_AUDIO_SPEC};

/// Failures while bringing up or feeding the audio device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open default playback device: {0}")]
    Open(String),
    #[error("failed to query playback device format: {0}")]
    Format(String),
    #[error("failed to create conversion stream from {from} to {to}")]
    Stream { from: AudioSpec, to: AudioSpec },
    #[error("failed to bind output stream to playback device: {0}")]
    Bind(String),
    #[error("failed to queue samples on playback device: {0}")]
    Submit(String),
}

/// Source of playback devices
pub trait AudioHost {
    /// Opens the system's default playback device
    fn open_default_playback(&mut self) -> Result<Box<dyn PlaybackDevice>, DeviceError>;
}

/// An opened playback device
pub trait PlaybackDevice {
    /// Device name for diagnostics
    fn name(&self) -> String;

    /// The spec the device expects samples to be submitted in
    fn native_spec(&self) -> Result<AudioSpec, DeviceError>;

    /// Starts an output stream on the device fed with `spec` audio
    fn bind(&mut self, spec: AudioSpec) -> Result<(), DeviceError>;

    /// Queues bytes (in the bound spec) behind anything already queued
    fn submit(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;
}

struct BoundOutput {
    device: Box<dyn PlaybackDevice>,
    stream: ConversionStream,
}

/// Owns the single output stream bound to the default playback device
///
/// Buffers must already be in [`TARGET_AUDIO_SPEC`]; conversion happens at
/// load time. Overlapping sounds are appended to the same stream, not mixed.
pub struct AudioManager {
    host: Box<dyn AudioHost>,
    output: Option<BoundOutput>,
}

impl AudioManager {
    pub fn new(host: Box<dyn AudioHost>) -> Self {
        Self { host, output: None }
    }

    /// Opens the default device and binds a stream converting the target spec
    /// into the device's native spec
    pub fn init(&mut self) -> Result<(), DeviceError> {
        let mut device = self.host.open_default_playback().inspect_err(|e| {
            error!(error = %e, "Failed to open audio device");
        })?;

        let device_spec = device.native_spec().inspect_err(|e| {
            error!(error = %e, "Failed to query audio device format");
        })?;

        info!(
            device = %device.name(),
            format = %device_spec.format,
            channels = device_spec.channels,
            freq = device_spec.freq,
            "Opened default audio device"
        );

        let stream = ConversionStream::new(TARGET_AUDIO_SPEC, device_spec).map_err(|e| {
            error!(error = %e, "Failed to create audio output stream");
            DeviceError::Stream {
                from: TARGET_AUDIO_SPEC,
                to: device_spec,
            }
        })?;

        info!(
            format = %TARGET_AUDIO_SPEC.format,
            channels = TARGET_AUDIO_SPEC.channels,
            freq = TARGET_AUDIO_SPEC.freq,
            "Created default audio stream"
        );

        device.bind(device_spec).inspect_err(|e| {
            error!(error = %e, "Failed to bind audio stream");
        })?;

        self.output = Some(BoundOutput { device, stream });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.output.is_some()
    }

    /// Queues `buffer` for playback
    ///
    /// Returns false (and logs) if the buffer is not in the target spec, the
    /// manager is not initialized, or the device refuses the samples.
    pub fn play_once(&mut self, buffer: &AudioBuffer) -> bool {
        if buffer.spec() != &TARGET_AUDIO_SPEC {
            error!(
                format = %buffer.spec().format,
                channels = buffer.spec().channels,
                freq = buffer.spec().freq,
                "Unexpected audio spec in call to play_once"
            );
            return false;
        }

        let Some(output) = self.output.as_mut() else {
            error!("play_once called before the audio device was initialized");
            return false;
        };

        output.stream.put(buffer.data());
        output.stream.flush();

        let mut converted = vec![0; output.stream.available()];
        let read = output.stream.get(&mut converted);
        converted.truncate(read);

        debug!(bytes = converted.len(), "Queueing audio buffer");

        if let Err(e) = output.device.submit(&converted) {
            error!(error = %e, "Failed to queue audio buffer");
            return false;
        }

        true
    }
}
