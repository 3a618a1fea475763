//! Desktop host
//!
//! Creates the window and renderer, translates winit events for the game
//! loop and drives one iteration per redraw.

mod input;
mod runner;
mod window;

pub use input::EventTranslator;
pub use runner::App;
pub use window::{HostWindow, window_attributes_from_config};
