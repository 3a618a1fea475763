//! Lifecycle state machine and per-frame scheduling

use tracing::{debug, error, info, trace};

use super::clock::{Clock, SystemClock};
use super::event::{Event, validate_touch};
use super::timestep::FixedTimestep;
use super::{Context, Game, GameError};
use crate::audio::{AudioHost, AudioManager};
use crate::config::{DebugConfig, TimingConfig};
use crate::content::Content;
use crate::render::{RenderBackend, WindowSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    /// Terminal; reached on quit or after any failure
    Terminating,
}

/// What the host should do after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Continue,
    Quit,
}

/// Drives a [`Game`] at a fixed simulation rate
///
/// Fields drop in declaration order, so the game's textures are released
/// before the renderer that created them.
pub struct GameLoop<G, R: RenderBackend> {
    game: G,
    renderer: R,
    window: Box<dyn WindowSurface>,
    audio: AudioManager,
    content: Content,
    debug: DebugConfig,
    clock: Box<dyn Clock>,
    timestep: FixedTimestep,
    state: LoopState,
    quit_requested: bool,
    pixel_width: u32,
    pixel_height: u32,
}

impl<G: Game<R>, R: RenderBackend> GameLoop<G, R> {
    pub fn new(
        game: G,
        renderer: R,
        window: Box<dyn WindowSurface>,
        audio_host: Box<dyn AudioHost>,
    ) -> Self {
        Self {
            game,
            renderer,
            window,
            audio: AudioManager::new(audio_host),
            content: Content::new("."),
            debug: DebugConfig::default(),
            clock: Box::new(SystemClock::default()),
            timestep: FixedTimestep::default(),
            state: LoopState::Uninitialized,
            quit_requested: false,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn with_timing(mut self, timing: &TimingConfig) -> Self {
        self.timestep =
            FixedTimestep::new(timing.fixed_step_ms).with_max_updates(timing.max_updates_per_frame);
        self
    }

    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    /// Brings up audio and the window, then runs the game's init hook
    ///
    /// On failure the loop is terminated and must not be iterated.
    pub fn init(&mut self) -> Result<(), GameError> {
        self.require_state(LoopState::Uninitialized, "initialize")?;

        let result = self.bring_up();
        match &result {
            Ok(()) => {
                self.state = LoopState::Running;
                info!("Game initialized");
            }
            Err(e) => {
                self.state = LoopState::Terminating;
                error!(error = %e, "Game initialization failed");
            }
        }
        result
    }

    fn bring_up(&mut self) -> Result<(), GameError> {
        self.audio.init()?;

        self.window.show();

        let (width, height) = self.window.size();
        let (pixel_width, pixel_height) = self.window.size_in_pixels();
        let density = self.window.pixel_density();

        info!(width, height, "Window size");
        info!(
            width = pixel_width,
            height = pixel_height,
            "Back buffer size"
        );
        if pixel_width != width || pixel_height != height {
            info!(pixel_density = density, "High DPI display");
        }

        self.pixel_width = pixel_width;
        self.pixel_height = pixel_height;

        self.with_context(|game, ctx| game.on_init(ctx))
    }

    /// Dispatches one host event
    ///
    /// Events that arrive after termination are ignored.
    pub fn handle_event(&mut self, event: &Event) -> Result<(), GameError> {
        match self.state {
            LoopState::Uninitialized => {
                return Err(GameError::InvalidState {
                    state: self.state,
                    operation: "handle events",
                });
            }
            LoopState::Terminating => {
                trace!(?event, "Ignoring event after termination");
                return Ok(());
            }
            LoopState::Running => {}
        }

        let result = self.dispatch(event);
        self.fail_on_error(result)
    }

    fn dispatch(&mut self, event: &Event) -> Result<(), GameError> {
        match *event {
            Event::Quit => {
                info!("Quit requested");
                self.quit_requested = true;
                Ok(())
            }
            Event::PixelSizeChanged { width, height } => {
                debug!(width, height, "Back buffer resized");
                self.pixel_width = width;
                self.pixel_height = height;
                self.renderer.resize(width, height);
                self.with_context(|game, ctx| game.on_render_resized(ctx, width, height))
            }
            Event::FingerDown { x, y } => match validate_touch(x, y) {
                Ok((x, y)) => {
                    let px = x * self.pixel_width as f32;
                    let py = y * self.pixel_height as f32;
                    self.with_context(|game, ctx| game.on_touch_finger_down(ctx, px, py))
                }
                Err(e) => {
                    trace!(error = %e, "Ignoring touch");
                    Ok(())
                }
            },
            Event::MouseButtonUp { x, y } => {
                let density = self.window.pixel_density();
                self.with_context(|game, ctx| game.on_mouse_click(ctx, x * density, y * density))
            }
        }
    }

    /// Runs one frame: input, fixed updates, render
    pub fn iterate(&mut self) -> Result<AppStatus, GameError> {
        self.require_state(LoopState::Running, "iterate")?;

        let result = self.frame();
        self.fail_on_error(result)?;

        if self.quit_requested {
            info!("Game loop terminating");
            self.state = LoopState::Terminating;
            return Ok(AppStatus::Quit);
        }

        Ok(AppStatus::Continue)
    }

    fn frame(&mut self) -> Result<(), GameError> {
        let elapsed_ms = self.timestep.advance(self.clock.now_ms());
        let delta_seconds = elapsed_ms as f32 / 1000.0;

        self.with_context(|game, ctx| game.on_input(ctx, delta_seconds))?;

        let step_seconds = self.timestep.step_seconds();
        let mut updates = 0;
        while self.timestep.consume_step(updates) {
            self.with_context(|game, ctx| game.on_update(ctx, step_seconds))?;
            updates += 1;
        }

        let extrapolation = self.timestep.extrapolation();
        trace!(elapsed_ms, updates, extrapolation, "Frame");

        self.with_context(|game, ctx| game.on_render(ctx, delta_seconds, extrapolation))
    }

    fn require_state(&self, expected: LoopState, operation: &'static str) -> Result<(), GameError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GameError::InvalidState {
                state: self.state,
                operation,
            })
        }
    }

    fn fail_on_error(&mut self, result: Result<(), GameError>) -> Result<(), GameError> {
        if let Err(e) = &result {
            error!(error = %e, "Game loop failed");
            self.state = LoopState::Terminating;
        }
        result
    }

    fn with_context<T>(&mut self, f: impl FnOnce(&mut G, &mut Context<'_, R>) -> T) -> T {
        let mut ctx = Context {
            renderer: &mut self.renderer,
            audio: &mut self.audio,
            content: &self.content,
            debug: &self.debug,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
        };
        f(&mut self.game, &mut ctx)
    }
}
