//! Rendering seam between the game loop and a concrete graphics backend
//!
//! - [`RenderBackend`]: draw/clear/present calls issued by games plus texture upload
//! - [`WindowSurface`]: window identity and pixel dimensions queried by the loop
//! - `wgpu_backend`: the wgpu implementation used by the game binary

pub mod wgpu_backend;

use thiserror::Error;

use crate::handle::Resource;

pub use wgpu_backend::{GpuTexture, WgpuRenderer};

/// Surface/texture creation or draw failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid surface: {0}")]
    InvalidSurface(String),
    #[error("failed to create texture: {0}")]
    TextureCreation(String),
    #[error("draw failed: {0}")]
    Draw(String),
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Normalized [0, 1] components
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Floating point rectangle in render pixels, origin at the top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FRect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Borrowed RGBA8888 pixels ready for upload
#[derive(Debug, Clone, Copy)]
pub struct Surface<'a> {
    width: u32,
    height: u32,
    pitch: u32,
    pixels: &'a [u8],
}

impl<'a> Surface<'a> {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wraps `pixels` without copying
    pub fn from_pixels(
        width: u32,
        height: u32,
        pitch: u32,
        pixels: &'a [u8],
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSurface(format!(
                "zero sized surface {width}x{height}"
            )));
        }
        if pitch < width * Self::BYTES_PER_PIXEL {
            return Err(RenderError::InvalidSurface(format!(
                "pitch {pitch} too small for width {width}"
            )));
        }
        if pixels.len() < (pitch * height) as usize {
            return Err(RenderError::InvalidSurface(format!(
                "{} bytes cannot hold {height} rows of pitch {pitch}",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pitch,
            pixels,
        })
    }

    /// Wraps a decoded image
    pub fn from_rgba(image: &'a image::RgbaImage) -> Result<Self, RenderError> {
        Self::from_pixels(
            image.width(),
            image.height(),
            image.width() * Self::BYTES_PER_PIXEL,
            image.as_raw(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }
}

/// Graphics backend a game draws through
///
/// Draw calls use the current draw color, mirroring an immediate-mode 2D API.
pub trait RenderBackend {
    /// Backend texture; released when its handle is dropped
    type Texture: Resource;

    /// Uploads `surface` into a new texture owned by the caller
    fn create_texture(&mut self, surface: &Surface<'_>) -> Result<Self::Texture, RenderError>;

    /// Called when the back buffer changes size
    fn resize(&mut self, width: u32, height: u32);

    fn set_draw_color(&mut self, color: Color);

    /// Fills the frame with the draw color
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Draws `src` of `texture` (the whole texture if `None`) into `dst`
    fn draw_texture(
        &mut self,
        texture: &Self::Texture,
        src: Option<FRect>,
        dst: FRect,
    ) -> Result<(), RenderError>;

    /// Draws the outline of `rect`
    fn draw_rect(&mut self, rect: FRect) -> Result<(), RenderError>;

    fn draw_line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), RenderError>;

    fn draw_point(&mut self, at: [f32; 2]) -> Result<(), RenderError>;

    /// Shows everything drawn since the last present
    fn present(&mut self) -> Result<(), RenderError>;
}

/// Window queries the game loop needs during bring-up and input handling
pub trait WindowSurface {
    /// Makes the window visible
    fn show(&self);

    /// Size in logical (DPI independent) units
    fn size(&self) -> (u32, u32);

    /// Size of the back buffer in pixels
    fn size_in_pixels(&self) -> (u32, u32);

    /// Ratio of pixels to logical units
    fn pixel_density(&self) -> f32;
}
