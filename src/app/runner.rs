//! Main application handler: hosts a game loop inside a winit event loop

use std::fmt::Display;
use std::sync::Arc;

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use super::input::EventTranslator;
use super::window::{HostWindow, window_attributes_from_config};
use crate::audio::cpal_backend::CpalHost;
use crate::config::AppConfig;
use crate::content::Content;
use crate::game::{AppStatus, Event, Game, GameLoop};
use crate::render::WgpuRenderer;

/// Hosts one game for the lifetime of the event loop
pub struct App<G: Game<WgpuRenderer>> {
    config: AppConfig,
    game: Option<G>,
    // Dropped before the window it draws into
    game_loop: Option<GameLoop<G, WgpuRenderer>>,
    window: Option<Arc<Window>>,
    input: EventTranslator,
    failed: bool,
}

impl<G: Game<WgpuRenderer>> App<G> {
    pub fn new(config: AppConfig, game: G) -> Self {
        info!(profile = %config.profile, "Starting game");
        info!(?config.window, "Window configuration");

        Self {
            config,
            game: Some(game),
            game_loop: None,
            window: None,
            input: EventTranslator::new(),
            failed: false,
        }
    }

    /// True if the loop stopped because of an error
    pub fn failed(&self) -> bool {
        self.failed
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(game) = self.game.take() else {
            return Ok(());
        };

        let window_attributes = window_attributes_from_config(&self.config.window);
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let size = window.inner_size();
        info!(
            window.width = size.width,
            window.height = size.height,
            "Window created successfully"
        );

        // winit's event loop is synchronous, so renderer bring-up blocks on a runtime
        let vsync = self.config.window.vsync;
        let renderer = tokio::runtime::Runtime::new()?
            .block_on(WgpuRenderer::new(window.clone(), vsync))?;

        let content = Content::from_config(&self.config.content)?;

        let mut game_loop = GameLoop::new(
            game,
            renderer,
            Box::new(HostWindow::new(window.clone())),
            Box::new(CpalHost::new()),
        )
        .with_content(content)
        .with_timing(&self.config.timing)
        .with_debug(self.config.debug.clone());

        self.input.set_scale_factor(window.scale_factor() as f32);
        self.input.set_pixel_size(size.width, size.height);

        // Keep the window alive even if init fails, so teardown runs in order
        self.window = Some(window);
        game_loop.init()?;
        self.game_loop = Some(game_loop);

        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: impl Display) {
        error!(error = %err, "Fatal error, exiting");
        self.failed = true;
        event_loop.exit();
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: Event) {
        let Some(game_loop) = &mut self.game_loop else {
            return;
        };
        if let Err(e) = game_loop.handle_event(&event) {
            self.fail(event_loop, e);
        }
    }

    fn iterate(&mut self, event_loop: &ActiveEventLoop) {
        let Some(game_loop) = &mut self.game_loop else {
            return;
        };
        match game_loop.iterate() {
            Ok(AppStatus::Continue) => {}
            Ok(AppStatus::Quit) => {
                info!("Game requested exit");
                event_loop.exit();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl<G: Game<WgpuRenderer>> ApplicationHandler for App<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && let Err(e) = self.start(event_loop)
        {
            self.fail(event_loop, format!("{e:#}"));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::ScaleFactorChanged { scale_factor, .. } = &event {
            self.input.set_scale_factor(*scale_factor as f32);
        }

        if let Some(game_event) = self.input.translate(&event) {
            self.dispatch(event_loop, game_event);
        }

        if let WindowEvent::RedrawRequested = event {
            self.iterate(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        info!("Shutting down");
        self.game_loop = None;
        self.window = None;
    }
}
