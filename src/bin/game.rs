//! Bubbles - desktop launcher
//!
//! # Usage
//!
//! ```bash
//! game
//! game --profile debug
//! game --content-dir path/to/content
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use winit::event_loop::{ControlFlow, EventLoop};

use forge::app::App;
use forge::build_info;
use forge::config::AppConfig;
use forge::render::WgpuRenderer;
use forge::sim::BubbleGame;

#[derive(Parser)]
#[command(name = "game")]
#[command(author, version, about = "Pop the bubbles before they float away")]
struct Args {
    /// Configuration profile (defaults to FORGE_PROFILE, then "release")
    #[arg(long)]
    profile: Option<String>,

    /// Directory content is loaded from (defaults to the executable's directory)
    #[arg(long)]
    content_dir: Option<PathBuf>,
}

fn init_tracing() {
    let default_filter = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn run(args: Args) -> Result<bool> {
    let profile = args.profile.unwrap_or_else(AppConfig::profile_from_env);
    let mut config = AppConfig::load(&profile).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using default configuration");
        AppConfig {
            profile: profile.clone(),
            ..AppConfig::default()
        }
    });

    if let Some(content_dir) = args.content_dir {
        config.content.base_path = Some(content_dir);
    }

    if let Ok(cwd) = std::env::current_dir() {
        info!(path = %cwd.display(), "Working directory");
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, BubbleGame::<WgpuRenderer>::new());
    event_loop.run_app(&mut app)?;

    Ok(!app.failed())
}

fn main() -> ExitCode {
    init_tracing();

    info!(version = %build_info::version_string(), "Bubbles");
    info!("{}", build_info::detailed_info());

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Application error");
            ExitCode::FAILURE
        }
    }
}
