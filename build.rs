use std::env;
use std::fs;
use std::path::Path;
use vergen::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Emit build metadata at build time
    let build = BuildBuilder::default().build_timestamp(true).build()?;

    let cargo = CargoBuilder::default()
        .opt_level(true)
        .target_triple(true)
        .build()?;

    let rustc = RustcBuilder::default()
        .semver(true)
        .channel(true)
        .build()?;

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?
        .emit()?;

    // The game resolves config and content relative to its executable, so both
    // directories are mirrored into the target directory.
    let target_dir = target_dir()?;
    copy_configs(&target_dir)?;
    copy_dir(Path::new("content"), &target_dir.join("content"))?;

    Ok(())
}

fn target_dir() -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let out_dir = env::var("OUT_DIR")?;

    // OUT_DIR is like: target/debug/build/forge-xxx/out
    // We want: target/debug
    let target_dir = Path::new(&out_dir)
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .ok_or("Could not determine target directory")?;

    Ok(target_dir.to_path_buf())
}

fn copy_configs(target_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let profile = env::var("PROFILE")?;

    let config_out_dir = target_dir.join("config");
    fs::create_dir_all(&config_out_dir)?;

    // Release builds only ship release.toml, debug builds get both profiles
    let profiles: &[&str] = if profile == "release" {
        &["release"]
    } else {
        &["debug", "release"]
    };

    for name in profiles {
        let source = Path::new("config").join(format!("{name}.toml"));
        if source.exists() {
            fs::copy(&source, config_out_dir.join(format!("{name}.toml")))?;
            println!("cargo:rerun-if-changed={}", source.display());
        }
    }

    Ok(())
}

fn copy_dir(source: &Path, destination: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !source.exists() {
        return Ok(());
    }

    println!("cargo:rerun-if-changed={}", source.display());
    fs::create_dir_all(destination)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let target = destination.join(entry.file_name());

        if path.is_dir() {
            copy_dir(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }

    Ok(())
}
