//! Fixed timestep game loop and the hooks a game implements
//!
//! The host drives a [`GameLoop`] through three entry points: `init` once,
//! then `handle_event` for every queued event and `iterate` once per frame.
//! Each iteration runs the input hook, zero or more fixed-size updates, then
//! one render with the fraction of the next step already elapsed.

pub mod clock;
pub mod event;
pub mod game_loop;
pub mod timestep;

use thiserror::Error;

use crate::audio::{AudioManager, DeviceError};
use crate::config::DebugConfig;
use crate::content::{Content, ContentError};
use crate::render::{Color, RenderBackend, RenderError};

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::Event;
pub use game_loop::{AppStatus, GameLoop, LoopState};
pub use timestep::{FIXED_STEP_MS, FixedTimestep};

/// Failures that stop the game loop
#[derive(Debug, Error)]
pub enum GameError {
    #[error("cannot {operation} while the loop is {state:?}")]
    InvalidState {
        state: LoopState,
        operation: &'static str,
    },
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Failure reported by a game hook
    #[error("{0}")]
    Game(String),
}

/// Input that fails validation; logged at trace level and otherwise dropped
#[derive(Debug, Error)]
pub(crate) enum ValidationError {
    #[error("touch at ({x}, {y}) is outside the unit square")]
    TouchOutOfBounds { x: f32, y: f32 },
}

/// Everything a hook may touch besides the game itself
pub struct Context<'a, R: RenderBackend> {
    pub renderer: &'a mut R,
    pub audio: &'a mut AudioManager,
    pub content: &'a Content,
    pub debug: &'a DebugConfig,
    /// Back buffer width in pixels
    pub pixel_width: u32,
    /// Back buffer height in pixels
    pub pixel_height: u32,
}

/// Lifecycle hooks of a concrete game
///
/// Every hook has a default, so a game implements only what it needs.
/// Returning an error from any hook stops the loop.
#[allow(unused_variables)]
pub trait Game<R: RenderBackend> {
    /// Called once after the audio device and window are up
    fn on_init(&mut self, ctx: &mut Context<'_, R>) -> Result<(), GameError> {
        Ok(())
    }

    /// Called once per frame with the real elapsed time
    fn on_input(&mut self, ctx: &mut Context<'_, R>, delta_seconds: f32) -> Result<(), GameError> {
        Ok(())
    }

    /// Called once per fixed step, always with the same `fixed_delta_seconds`
    fn on_update(
        &mut self,
        ctx: &mut Context<'_, R>,
        fixed_delta_seconds: f32,
    ) -> Result<(), GameError> {
        Ok(())
    }

    /// Called once per frame; `extrapolation` is in [0, 1)
    fn on_render(
        &mut self,
        ctx: &mut Context<'_, R>,
        delta_seconds: f32,
        extrapolation: f32,
    ) -> Result<(), GameError> {
        ctx.renderer.set_draw_color(Color::YELLOW);
        ctx.renderer.clear()?;
        ctx.renderer.present()?;
        Ok(())
    }

    fn on_render_resized(
        &mut self,
        ctx: &mut Context<'_, R>,
        width: u32,
        height: u32,
    ) -> Result<(), GameError> {
        Ok(())
    }

    /// Mouse release, in pixels
    fn on_mouse_click(&mut self, ctx: &mut Context<'_, R>, x: f32, y: f32) -> Result<(), GameError> {
        Ok(())
    }

    /// Touch down, in pixels
    fn on_touch_finger_down(
        &mut self,
        ctx: &mut Context<'_, R>,
        x: f32,
        y: f32,
    ) -> Result<(), GameError> {
        Ok(())
    }
}
