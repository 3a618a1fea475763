//! Forge
//!
//! A small 2D game runtime built with Rust, winit, wgpu and cpal: a fixed
//! timestep game loop, content loading that normalizes images and audio for
//! the renderer and output device, and a bubble popping demo game.

/// Desktop host - window creation and event translation
pub mod app;

/// Audio data model, conversion and playback
pub mod audio;

/// Build-time information (timestamp, target, compiler)
pub mod build_info;

/// Profile based configuration
pub mod config;

/// Image and audio loading
pub mod content;

/// Fixed timestep game loop and lifecycle hooks
pub mod game;

/// Owning wrappers for platform resources
pub mod handle;

/// Rendering backend seam and the wgpu implementation
pub mod render;

/// Games built on the loop
pub mod sim;
