//! Content loading: images to textures, audio files to playable buffers
//!
//! Every path is resolved against one base directory chosen at startup.
//! Failures are logged with the offending path and returned to the caller,
//! which decides whether they are fatal.

pub mod codec;
pub mod stream;

use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::audio::{
    AudioBuffer, AudioError, AudioSpec, SampleFormat, TARGET_AUDIO_SPEC, resample_if_needed,
};
use crate::config::{ContentConfig, TruncatedReadPolicy};
use crate::handle::Handle;
use crate::render::{RenderBackend, RenderError, Surface};

pub use codec::{ImageCodec, ImageDecodeError, StandardImageCodec};
pub use stream::{CodecIo, CodecReader, ContentStream};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("failed to upload {} to the renderer: {source}", path.display())]
    RenderUpload {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("short read from {}: expected {expected} bytes, got {read}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        read: u64,
    },
    #[error("failed to convert audio from {}: {source}", path.display())]
    Convert {
        path: PathBuf,
        #[source]
        source: AudioError,
    },
}

impl ContentError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn decode(path: &Path, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Loads content files relative to a base directory
pub struct Content {
    base: PathBuf,
    codec: Box<dyn ImageCodec>,
    truncated_reads: TruncatedReadPolicy,
}

impl Content {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            codec: Box::new(StandardImageCodec),
            truncated_reads: TruncatedReadPolicy::default(),
        }
    }

    /// Uses `config.base_path`, or the running executable's directory
    pub fn from_config(config: &ContentConfig) -> Result<Self, ContentError> {
        let base = match &config.base_path {
            Some(path) => path.clone(),
            None => executable_dir()?,
        };

        info!(path = %base.display(), "Content base path");

        Ok(Self::new(base).with_truncated_reads(config.truncated_reads))
    }

    pub fn with_codec(mut self, codec: Box<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_truncated_reads(mut self, policy: TruncatedReadPolicy) -> Self {
        self.truncated_reads = policy;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// Resolves `path` against the base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base.join(path)
    }

    fn open(&self, path: &Path) -> Result<ContentStream, ContentError> {
        ContentStream::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to open content file");
            ContentError::io(path, e)
        })
    }

    /// Decodes an image and uploads it as a texture owned by the caller
    pub fn load_texture<R: RenderBackend>(
        &self,
        renderer: &mut R,
        path: impl AsRef<Path>,
    ) -> Result<Handle<R::Texture>, ContentError> {
        let path = self.resolve(path);
        let mut stream = self.open(&path)?;

        let image = self.codec.decode_rgba(&mut stream).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to decode image");
            ContentError::decode(&path, e)
        })?;

        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );

        let surface = Surface::from_rgba(&image).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to wrap decoded pixels");
            ContentError::RenderUpload {
                path: path.clone(),
                source: e,
            }
        })?;

        let texture = renderer.create_texture(&surface).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to create texture");
            ContentError::RenderUpload {
                path: path.clone(),
                source: e,
            }
        })?;

        info!(
            path = %path.display(),
            width = surface.width(),
            height = surface.height(),
            "Loaded texture"
        );

        Ok(Handle::new(texture))
    }

    /// Reads a whole file
    ///
    /// A file that yields fewer bytes than its reported size is handled
    /// according to the configured [`TruncatedReadPolicy`].
    pub fn load_binary(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, ContentError> {
        let path = self.resolve(path);
        let mut stream = self.open(&path)?;

        let expected = stream.size();
        let len = usize::try_from(expected).map_err(|_| {
            ContentError::io(
                &path,
                io::Error::new(io::ErrorKind::OutOfMemory, "file too large"),
            )
        })?;

        let data = read_sized(&mut stream, len, self.truncated_reads, &path)?;

        debug!(path = %path.display(), bytes = data.len(), "Loaded binary file");
        Ok(data)
    }

    /// Decodes a WAV file and converts it to [`TARGET_AUDIO_SPEC`]
    pub fn load_wav(&self, path: impl AsRef<Path>) -> Result<AudioBuffer, ContentError> {
        let path = self.resolve(path);
        let stream = self.open(&path)?;

        let buffer = decode_wav(stream).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to decode WAV");
            ContentError::decode(&path, e)
        })?;

        self.normalize(&path, buffer)
    }

    /// Decodes an Ogg Vorbis file and converts it to [`TARGET_AUDIO_SPEC`]
    pub fn load_ogg(&self, path: impl AsRef<Path>) -> Result<AudioBuffer, ContentError> {
        let path = self.resolve(path);
        let stream = self.open(&path)?;

        let buffer = decode_ogg(stream).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to decode Ogg Vorbis");
            ContentError::decode(&path, e)
        })?;

        self.normalize(&path, buffer)
    }

    fn normalize(&self, path: &Path, buffer: AudioBuffer) -> Result<AudioBuffer, ContentError> {
        debug!(
            path = %path.display(),
            spec = %buffer.spec(),
            bytes = buffer.size_in_bytes(),
            "Decoded audio"
        );

        let buffer = resample_if_needed(buffer, &TARGET_AUDIO_SPEC).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to convert audio");
            ContentError::Convert {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        info!(
            path = %path.display(),
            bytes = buffer.size_in_bytes(),
            seconds = buffer.duration().as_secs_f32(),
            "Loaded audio"
        );

        Ok(buffer)
    }
}

/// Reads `len` bytes from `reader`, applying `policy` if it ends early
fn read_sized<R: Read>(
    reader: &mut R,
    len: usize,
    policy: TruncatedReadPolicy,
    path: &Path,
) -> Result<Vec<u8>, ContentError> {
    let mut data = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut data[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read file");
                return Err(ContentError::io(path, e));
            }
        }
    }

    if filled < len {
        match policy {
            TruncatedReadPolicy::Fail => {
                error!(
                    path = %path.display(),
                    expected = len,
                    read = filled,
                    "Short read"
                );
                return Err(ContentError::Truncated {
                    path: path.to_path_buf(),
                    expected: len as u64,
                    read: filled as u64,
                });
            }
            TruncatedReadPolicy::Truncate => {
                warn!(
                    path = %path.display(),
                    expected = len,
                    read = filled,
                    "Short read, returning partial content"
                );
                data.truncate(filled);
            }
        }
    }

    Ok(data)
}

fn executable_dir() -> Result<PathBuf, ContentError> {
    let exe = std::env::current_exe().map_err(|e| ContentError::io(Path::new("<executable>"), e))?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        ContentError::io(
            &exe,
            io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"),
        )
    })
}

fn decode_wav(stream: ContentStream) -> Result<AudioBuffer, hound::Error> {
    let mut reader = hound::WavReader::new(BufReader::new(stream))?;
    let wav = reader.spec();

    let (format, data) = match (wav.sample_format, wav.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => {
            let mut data = Vec::with_capacity(reader.len() as usize * 4);
            for sample in reader.samples::<f32>() {
                data.extend_from_slice(&sample?.to_le_bytes());
            }
            (SampleFormat::F32Le, data)
        }
        (hound::SampleFormat::Int, 8) => {
            let mut data = Vec::with_capacity(reader.len() as usize);
            for sample in reader.samples::<i8>() {
                data.push(sample? as u8);
            }
            (SampleFormat::S8, data)
        }
        (hound::SampleFormat::Int, 16) => {
            let mut data = Vec::with_capacity(reader.len() as usize * 2);
            for sample in reader.samples::<i16>() {
                data.extend_from_slice(&sample?.to_le_bytes());
            }
            (SampleFormat::S16Le, data)
        }
        (hound::SampleFormat::Int, bits @ (24 | 32)) => {
            // 24-bit samples are widened into the top of a 32-bit word
            let shift = 32 - u32::from(bits);
            let mut data = Vec::with_capacity(reader.len() as usize * 4);
            for sample in reader.samples::<i32>() {
                data.extend_from_slice(&(sample? << shift).to_le_bytes());
            }
            (SampleFormat::S32Le, data)
        }
        _ => return Err(hound::Error::Unsupported),
    };

    Ok(AudioBuffer::new(
        AudioSpec::new(format, wav.channels, wav.sample_rate),
        data,
    ))
}

fn decode_ogg(stream: ContentStream) -> Result<AudioBuffer, lewton::VorbisError> {
    let mut reader = lewton::inside_ogg::OggStreamReader::new(BufReader::new(stream))?;
    let spec = AudioSpec::new(
        SampleFormat::S16Le,
        u16::from(reader.ident_hdr.audio_channels),
        reader.ident_hdr.audio_sample_rate,
    );

    let mut data = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        for sample in packet {
            data.extend_from_slice(&sample.to_le_bytes());
        }
    }

    Ok(AudioBuffer::new(spec, data))
}
