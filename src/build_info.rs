//! Build-time information captured by `build.rs`

/// Crate version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// When the binary was compiled
pub const BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// Cargo optimization level (0, 1, 2, 3, s, z)
pub const CARGO_OPT_LEVEL: &str = env!("VERGEN_CARGO_OPT_LEVEL");

/// Target triple (e.g., x86_64-unknown-linux-gnu)
pub const CARGO_TARGET_TRIPLE: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");

pub const RUSTC_SEMVER: &str = env!("VERGEN_RUSTC_SEMVER");

pub const RUSTC_CHANNEL: &str = env!("VERGEN_RUSTC_CHANNEL");

/// `{version}+{target_triple}-opt{opt_level}`, e.g. `0.1.0+x86_64-unknown-linux-gnu-opt3`
pub fn version_string() -> String {
    format!("{PKG_VERSION}+{CARGO_TARGET_TRIPLE}-opt{CARGO_OPT_LEVEL}")
}

/// One line per fact, for the startup log
pub fn detailed_info() -> String {
    format!(
        "Built: {BUILD_TIMESTAMP}\nTarget: {CARGO_TARGET_TRIPLE}\nOptimization: {CARGO_OPT_LEVEL}\nRustc: {RUSTC_SEMVER} ({RUSTC_CHANNEL})"
    )
}
