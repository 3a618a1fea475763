//! Pluggable image decoding

use std::io::Read;

use image::RgbaImage;
use thiserror::Error;

use super::stream::{CodecIo, CodecReader};

#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("failed to read image bytes: {0}")]
    Io(#[from] std::io::Error),
    #[error("no image data")]
    Empty,
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Decodes arbitrary image bytes into RGBA8888 pixels
pub trait ImageCodec {
    fn decode_rgba(&self, io: &mut dyn CodecIo) -> Result<RgbaImage, ImageDecodeError>;
}

/// Decodes any format the `image` crate recognizes (PNG, JPEG, BMP, ...)
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardImageCodec;

impl ImageCodec for StandardImageCodec {
    fn decode_rgba(&self, io: &mut dyn CodecIo) -> Result<RgbaImage, ImageDecodeError> {
        let mut bytes = Vec::new();
        CodecReader::new(io).read_to_end(&mut bytes)?;

        if bytes.is_empty() {
            return Err(ImageDecodeError::Empty);
        }

        Ok(image::load_from_memory(&bytes)?.into_rgba8())
    }
}
