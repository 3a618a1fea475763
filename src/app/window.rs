//! Window configuration and management

use std::sync::Arc;

use winit::dpi::LogicalSize;
use winit::window::{Fullscreen, Window, WindowAttributes};

use crate::config::WindowConfig;
use crate::render::WindowSurface;

/// Creates window attributes from configuration
///
/// The window starts hidden; the game loop shows it once bring-up succeeds.
pub fn window_attributes_from_config(config: &WindowConfig) -> WindowAttributes {
    let mut attrs = WindowAttributes::default()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_resizable(config.resizable)
        .with_decorations(config.decorated)
        .with_visible(false);

    if config.fullscreen {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    attrs
}

/// A winit window seen through [`WindowSurface`]
pub struct HostWindow(Arc<Window>);

impl HostWindow {
    pub fn new(window: Arc<Window>) -> Self {
        Self(window)
    }
}

impl WindowSurface for HostWindow {
    fn show(&self) {
        self.0.set_visible(true);
    }

    fn size(&self) -> (u32, u32) {
        let logical: LogicalSize<u32> = self.0.inner_size().to_logical(self.0.scale_factor());
        (logical.width, logical.height)
    }

    fn size_in_pixels(&self) -> (u32, u32) {
        let size = self.0.inner_size();
        (size.width, size.height)
    }

    fn pixel_density(&self) -> f32 {
        self.0.scale_factor() as f32
    }
}
