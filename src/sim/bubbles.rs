//! Bubble popping demo
//!
//! Bubbles rise from the bottom of the screen with a sideways wobble and pop
//! when clicked or touched. Simulation coordinates have y pointing up; the
//! render pass flips them into screen space.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::audio::AudioBuffer;
use crate::game::{Context, Game, GameError};
use crate::handle::Handle;
use crate::render::{Color, FRect, RenderBackend};

pub const BUBBLE_POOL_SIZE: usize = 64;

const BUBBLE_SIZES: [f32; 4] = [48.0, 64.0, 72.0, 128.0];
const MIN_FLOAT_SPEED: f32 = 90.0;
const MAX_FLOAT_SPEED: f32 = 150.0;
const MIN_WOBBLE_AMPLITUDE: f32 = 0.05;
const MAX_WOBBLE_AMPLITUDE: f32 = 1.0;
const MIN_WOBBLE_PERIOD: f32 = 0.2;
const MAX_WOBBLE_PERIOD: f32 = 2.0;
/// Hit radius as a fraction of the sprite's half size
const CLICK_FUZZ: f32 = 0.9;

const BACKGROUND: Color = Color::rgb(25, 150, 255);

pub const BUBBLE_TEXTURE: &str = "bubble.png";
pub const POP_SOUND: &str = "pop.wav";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    /// Center, in pixels with y up
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub radius: f32,
    /// Pixels per second upwards
    pub speed: f32,
    pub wobble_amplitude: f32,
    pub wobble_period: f32,
    pub wobble_offset: f32,
    pub alive: bool,
}

impl Default for Bubble {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            size: 64.0,
            radius: 0.0,
            speed: 100.0,
            wobble_amplitude: 0.0,
            wobble_period: 1.0,
            wobble_offset: 0.0,
            alive: false,
        }
    }
}

impl Bubble {
    fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy < self.radius * self.radius
    }
}

/// The bubble pool and its simulation, independent of rendering
#[derive(Debug)]
pub struct BubbleField {
    bubbles: Vec<Bubble>,
    rng: StdRng,
    elapsed: f32,
}

impl BubbleField {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic field for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            bubbles: vec![Bubble::default(); BUBBLE_POOL_SIZE],
            rng,
            elapsed: 0.0,
        }
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn bubbles_mut(&mut self) -> &mut [Bubble] {
        &mut self.bubbles
    }

    pub fn alive_count(&self) -> usize {
        self.bubbles.iter().filter(|b| b.alive).count()
    }

    /// Advances one fixed step inside a `width` x `height` pixel area
    pub fn update(&mut self, dt: f32, width: f32, height: f32) {
        self.elapsed += dt;

        for i in 0..self.bubbles.len() {
            if !self.bubbles[i].alive {
                self.bubbles[i] = self.spawn(width);
            }
        }

        for bubble in self.bubbles.iter_mut().filter(|b| b.alive) {
            bubble.y += bubble.speed * dt;
            bubble.x += (bubble.wobble_offset + self.elapsed * bubble.wobble_period).sin()
                * bubble.wobble_amplitude;

            if bubble.y >= height + bubble.size {
                bubble.alive = false;
            }
        }
    }

    fn spawn(&mut self, width: f32) -> Bubble {
        let size = BUBBLE_SIZES[self.rng.random_range(0..BUBBLE_SIZES.len())];
        let half = size / 2.0;
        let x = if width > size {
            self.rng.random_range(0.0..=width).clamp(half, width - half)
        } else {
            width / 2.0
        };

        Bubble {
            x,
            y: -size,
            size,
            radius: half * CLICK_FUZZ,
            speed: self.rng.random_range(MIN_FLOAT_SPEED..=MAX_FLOAT_SPEED),
            wobble_amplitude: self
                .rng
                .random_range(MIN_WOBBLE_AMPLITUDE..=MAX_WOBBLE_AMPLITUDE),
            wobble_period: self.rng.random_range(MIN_WOBBLE_PERIOD..=MAX_WOBBLE_PERIOD),
            wobble_offset: self.rng.random_range(0.0..TAU),
            alive: true,
        }
    }

    /// Pops the first live bubble under (`x`, `y`), returning a copy of it
    pub fn pop_at(&mut self, x: f32, y: f32) -> Option<Bubble> {
        let bubble = self
            .bubbles
            .iter_mut()
            .find(|b| b.alive && b.contains(x, y))?;
        bubble.alive = false;
        Some(*bubble)
    }
}

impl Default for BubbleField {
    fn default() -> Self {
        Self::new()
    }
}

/// Line from the last click to the bubble it popped, in screen space
#[derive(Debug, Clone, Copy)]
struct ClickMarker {
    from: [f32; 2],
    to: [f32; 2],
    seconds_left: f32,
}

pub struct BubbleGame<R: RenderBackend> {
    field: BubbleField,
    texture: Handle<R::Texture>,
    pop_sound: Option<AudioBuffer>,
    marker: Option<ClickMarker>,
    step_seconds: f32,
    popped: u32,
}

impl<R: RenderBackend> BubbleGame<R> {
    pub fn new() -> Self {
        Self::with_field(BubbleField::new())
    }

    pub fn with_field(field: BubbleField) -> Self {
        Self {
            field,
            texture: Handle::empty(),
            pop_sound: None,
            marker: None,
            step_seconds: 0.0,
            popped: 0,
        }
    }

    pub fn field(&self) -> &BubbleField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut BubbleField {
        &mut self.field
    }

    pub fn popped(&self) -> u32 {
        self.popped
    }

    pub fn has_click_marker(&self) -> bool {
        self.marker.is_some()
    }

    /// Pops at a screen-space pixel position (y down)
    fn pop(&mut self, ctx: &mut Context<'_, R>, x: f32, y: f32) {
        let height = ctx.pixel_height as f32;
        let sim_y = height - y;

        let target = match self.field.pop_at(x, sim_y) {
            Some(bubble) => {
                self.popped += 1;
                info!(
                    bubble_x = bubble.x,
                    bubble_y = bubble.y,
                    radius = bubble.radius,
                    x,
                    y = sim_y,
                    popped = self.popped,
                    "Popped bubble"
                );

                if let Some(sound) = &self.pop_sound {
                    if !ctx.audio.play_once(sound) {
                        debug!(popped = self.popped, "Pop sound was not queued");
                    }
                }

                [bubble.x, height - bubble.y]
            }
            None => {
                debug!(x, y = sim_y, "Missed");
                [x, y]
            }
        };

        if ctx.debug.draw_clicks {
            self.marker = Some(ClickMarker {
                from: [x, y],
                to: target,
                seconds_left: ctx.debug.click_marker_seconds,
            });
        }
    }
}

impl<R: RenderBackend> Default for BubbleGame<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RenderBackend> Game<R> for BubbleGame<R> {
    fn on_init(&mut self, ctx: &mut Context<'_, R>) -> Result<(), GameError> {
        self.texture = ctx.content.load_texture(&mut *ctx.renderer, BUBBLE_TEXTURE)?;
        self.pop_sound = Some(ctx.content.load_wav(POP_SOUND)?);

        info!(pool = BUBBLE_POOL_SIZE, "Bubble game ready");
        Ok(())
    }

    fn on_update(
        &mut self,
        ctx: &mut Context<'_, R>,
        fixed_delta_seconds: f32,
    ) -> Result<(), GameError> {
        self.step_seconds = fixed_delta_seconds;
        self.field.update(
            fixed_delta_seconds,
            ctx.pixel_width as f32,
            ctx.pixel_height as f32,
        );
        Ok(())
    }

    fn on_render(
        &mut self,
        ctx: &mut Context<'_, R>,
        delta_seconds: f32,
        extrapolation: f32,
    ) -> Result<(), GameError> {
        let height = ctx.pixel_height as f32;
        let renderer = &mut *ctx.renderer;

        renderer.set_draw_color(BACKGROUND);
        renderer.clear()?;

        if let Some(texture) = self.texture.get() {
            for bubble in self.field.bubbles().iter().filter(|b| b.alive) {
                // Draw where the bubble will be part way into the next step
                let y = bubble.y + bubble.speed * self.step_seconds * extrapolation;
                let half = bubble.size / 2.0;
                let dst = FRect::new(bubble.x - half, height - (y + half), bubble.size, bubble.size);

                renderer.draw_texture(texture, None, dst)?;

                if ctx.debug.draw_entity_bounds {
                    renderer.set_draw_color(Color::MAGENTA);
                    renderer.draw_rect(dst)?;
                    renderer.set_draw_color(Color::WHITE);
                    renderer.draw_point([bubble.x, height - y])?;
                }
            }
        }

        if let Some(marker) = &mut self.marker {
            renderer.set_draw_color(Color::MAGENTA);
            renderer.draw_line(marker.from, marker.to)?;
            renderer.set_draw_color(Color::WHITE);
            renderer.draw_point(marker.from)?;

            marker.seconds_left -= delta_seconds;
            if marker.seconds_left <= 0.0 {
                self.marker = None;
            }
        }

        renderer.present()?;
        Ok(())
    }

    fn on_mouse_click(&mut self, ctx: &mut Context<'_, R>, x: f32, y: f32) -> Result<(), GameError> {
        self.pop(ctx, x, y);
        Ok(())
    }

    fn on_touch_finger_down(
        &mut self,
        ctx: &mut Context<'_, R>,
        x: f32,
        y: f32,
    ) -> Result<(), GameError> {
        self.pop(ctx, x, y);
        Ok(())
    }
}
