//! Application configuration
//!
//! Supports multiple profiles (debug, release) with different settings.
//! Every section carries serde defaults, so a profile file only needs the
//! keys it overrides.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, e.g. `FORGE_WINDOW__WIDTH=1920`
pub const ENV_PREFIX: &str = "FORGE";

/// Profile used when neither `--profile` nor `FORGE_PROFILE` is given
pub const DEFAULT_PROFILE: &str = "release";

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width in logical units
    pub width: f64,
    /// Window height in logical units
    pub height: f64,
    /// Whether the window should be fullscreen
    pub fullscreen: bool,
    /// Whether the window should be resizable
    pub resizable: bool,
    /// Whether the window should be decorated (has title bar, borders, etc.)
    pub decorated: bool,
    /// Whether to enable vsync
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Bubbles".to_string(),
            width: 800.0,
            height: 600.0,
            fullscreen: false,
            resizable: true,
            decorated: true,
            vsync: true,
        }
    }
}

/// What `load_binary` does when a file yields fewer bytes than its size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncatedReadPolicy {
    /// Report the short read as an error
    #[default]
    Fail,
    /// Warn and return the bytes that were read
    Truncate,
}

/// Content loading configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Base directory for content; the executable's directory when unset
    pub base_path: Option<PathBuf>,
    pub truncated_reads: TruncatedReadPolicy,
}

/// Fixed timestep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Length of one simulation step in milliseconds
    pub fixed_step_ms: u64,
    /// Catch-up cap; `None` runs every pending step
    pub max_updates_per_frame: Option<u32>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixed_step_ms: crate::game::FIXED_STEP_MS,
            max_updates_per_frame: None,
        }
    }
}

/// Debug drawing toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Outline every entity's bounding box
    pub draw_entity_bounds: bool,
    /// Mark the last click or touch position
    pub draw_clicks: bool,
    /// How long a click marker stays visible
    pub click_marker_seconds: f32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            draw_entity_bounds: false,
            draw_clicks: false,
            click_marker_seconds: 1.0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The active profile (debug, release, etc.)
    pub profile: String,
    pub window: WindowConfig,
    pub content: ContentConfig,
    pub timing: TimingConfig,
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Loads configuration based on the specified profile
    ///
    /// Sources, lowest priority first:
    /// 1. config/{profile}.toml
    /// 2. Environment variables with prefix FORGE_ (e.g., FORGE_WINDOW__WIDTH=1920)
    ///
    /// Config files are searched for in:
    /// 1. Next to the executable (target/debug/config or target/release/config)
    /// 2. In the current directory (./config)
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        let config_dir = Self::find_config_dir().unwrap_or_else(|| PathBuf::from("config"));
        Self::load_from(&config_dir, profile)
    }

    /// Loads `{profile}.toml` from `config_dir`, then applies environment overrides
    pub fn load_from(config_dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile_path = config_dir.join(profile);

        let config = Config::builder()
            .add_source(File::from(profile_path.as_path()).required(false))
            // Use __ as separator for nested fields (e.g., FORGE_WINDOW__WIDTH)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("profile", profile)?
            .build()?;

        config.try_deserialize()
    }

    /// Finds the config directory by searching in multiple locations
    fn find_config_dir() -> Option<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe()
            && let Some(exe_dir) = exe_path.parent()
        {
            let config_dir = exe_dir.join("config");
            if config_dir.exists() {
                return Some(config_dir);
            }
        }

        let cwd_config = PathBuf::from("config");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        None
    }

    /// Profile named by FORGE_PROFILE, defaulting to "release"
    pub fn profile_from_env() -> String {
        std::env::var(format!("{ENV_PREFIX}_PROFILE"))
            .unwrap_or_else(|_| DEFAULT_PROFILE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_profile_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path(), "nonexistent").unwrap();

        assert_eq!(config.profile, "nonexistent");
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.timing.fixed_step_ms, 16);
        assert_eq!(config.timing.max_updates_per_frame, None);
        assert_eq!(config.content.truncated_reads, TruncatedReadPolicy::Fail);
    }

    #[test]
    fn test_partial_profile_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.toml"),
            r#"
[window]
title = "Custom"

[content]
truncated_reads = "truncate"

[debug]
draw_clicks = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path(), "custom").unwrap();

        assert_eq!(config.window.title, "Custom");
        assert_eq!(config.window.width, 800.0);
        assert_eq!(config.content.truncated_reads, TruncatedReadPolicy::Truncate);
        assert!(config.debug.draw_clicks);
        assert!(!config.debug.draw_entity_bounds);
        assert_eq!(config.debug.click_marker_seconds, 1.0);
    }

    #[test]
    fn test_timing_cap_parses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("capped.toml"),
            "[timing]\nfixed_step_ms = 10\nmax_updates_per_frame = 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path(), "capped").unwrap();
        assert_eq!(config.timing.fixed_step_ms, 10);
        assert_eq!(config.timing.max_updates_per_frame, Some(5));
    }
}
