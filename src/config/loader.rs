// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{BuildConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks cross-references (toolchains, dependencies, repositories,
///   `after`), task ids and global config sanity.
/// - Anchors relative paths at the directory containing the config file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildConfig> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = BuildConfig::try_from(raw_config)?;
    Ok(config.with_root(config_root_dir(path)))
}

/// Path of the config file when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Buildweave.toml")
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "android/Buildweave.toml"),
///   we use that directory, made absolute.
/// - If it's just a bare filename like "Buildweave.toml" (parent = ""),
///   we fall back to the current working directory ".".
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
        }
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
