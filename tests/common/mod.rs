//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use forge::audio::{AudioHost, AudioSpec, DeviceError, PlaybackDevice, TARGET_AUDIO_SPEC};
use forge::handle::Resource;
use forge::render::{Color, FRect, RenderBackend, RenderError, Surface, WindowSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Texture { id: u32, dst: FRect },
    Rect(FRect),
    Line([f32; 2], [f32; 2]),
    Point([f32; 2]),
    Present,
}

#[derive(Debug)]
pub struct FakeTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    released: Rc<Cell<u32>>,
}

impl Resource for FakeTexture {
    const KIND: &'static str = "fake texture";
    type Error = Infallible;

    fn release(self) -> Result<(), Self::Error> {
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

/// Records every call instead of drawing
pub struct FakeRenderer {
    pub ops: Vec<DrawOp>,
    pub resizes: Vec<(u32, u32)>,
    pub color: Color,
    pub fail_texture: bool,
    pub fail_present: bool,
    pub released: Rc<Cell<u32>>,
    next_id: u32,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            resizes: Vec::new(),
            color: Color::WHITE,
            fail_texture: false,
            fail_present: false,
            released: Rc::new(Cell::new(0)),
            next_id: 0,
        }
    }

    pub fn textures_drawn(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Texture { .. }))
            .count()
    }
}

impl RenderBackend for FakeRenderer {
    type Texture = FakeTexture;

    fn create_texture(&mut self, surface: &Surface<'_>) -> Result<FakeTexture, RenderError> {
        if self.fail_texture {
            return Err(RenderError::TextureCreation("out of video memory".into()));
        }
        self.next_id += 1;
        Ok(FakeTexture {
            id: self.next_id,
            width: surface.width(),
            height: surface.height(),
            released: self.released.clone(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }

    fn set_draw_color(&mut self, color: Color) {
        self.color = color;
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.ops.push(DrawOp::Clear(self.color));
        Ok(())
    }

    fn draw_texture(
        &mut self,
        texture: &FakeTexture,
        _src: Option<FRect>,
        dst: FRect,
    ) -> Result<(), RenderError> {
        self.ops.push(DrawOp::Texture {
            id: texture.id,
            dst,
        });
        Ok(())
    }

    fn draw_rect(&mut self, rect: FRect) -> Result<(), RenderError> {
        self.ops.push(DrawOp::Rect(rect));
        Ok(())
    }

    fn draw_line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), RenderError> {
        self.ops.push(DrawOp::Line(from, to));
        Ok(())
    }

    fn draw_point(&mut self, at: [f32; 2]) -> Result<(), RenderError> {
        self.ops.push(DrawOp::Point(at));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if self.fail_present {
            return Err(RenderError::Present("device lost".into()));
        }
        self.ops.push(DrawOp::Present);
        Ok(())
    }
}

pub struct FakeWindow {
    pub size: (u32, u32),
    pub pixels: (u32, u32),
    pub density: f32,
    pub shown: Rc<Cell<bool>>,
}

impl FakeWindow {
    pub fn new(size: (u32, u32), density: f32) -> Self {
        Self {
            size,
            pixels: (
                (size.0 as f32 * density) as u32,
                (size.1 as f32 * density) as u32,
            ),
            density,
            shown: Rc::new(Cell::new(false)),
        }
    }
}

impl WindowSurface for FakeWindow {
    fn show(&self) {
        self.shown.set(true);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn size_in_pixels(&self) -> (u32, u32) {
        self.pixels
    }

    fn pixel_density(&self) -> f32 {
        self.density
    }
}

/// Audio host whose device accepts the target spec and keeps what it is sent
pub struct FakeAudioHost {
    pub fail_open: bool,
    pub fail_submit: bool,
    pub submitted: Rc<RefCell<Vec<u8>>>,
}

impl FakeAudioHost {
    pub fn new() -> Self {
        Self {
            fail_open: false,
            fail_submit: false,
            submitted: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn rejecting_submits() -> Self {
        Self {
            fail_submit: true,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }
}

struct FakeDevice {
    fail_submit: bool,
    submitted: Rc<RefCell<Vec<u8>>>,
}

impl AudioHost for FakeAudioHost {
    fn open_default_playback(&mut self) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::Open("no audio hardware".into()));
        }
        Ok(Box::new(FakeDevice {
            fail_submit: self.fail_submit,
            submitted: self.submitted.clone(),
        }))
    }
}

impl PlaybackDevice for FakeDevice {
    fn name(&self) -> String {
        "fake output".into()
    }

    fn native_spec(&self) -> Result<AudioSpec, DeviceError> {
        Ok(TARGET_AUDIO_SPEC)
    }

    fn bind(&mut self, _spec: AudioSpec) -> Result<(), DeviceError> {
        Ok(())
    }

    fn submit(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        if self.fail_submit {
            return Err(DeviceError::Submit("ring buffer full".into()));
        }
        self.submitted.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }
}
