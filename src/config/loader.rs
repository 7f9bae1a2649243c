// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ProjectConfig, RawProjectConfig};
use crate::errors::{BuildwebError, Result};

/// Load a project file from a given path and return the raw `RawProjectConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectConfig> {
    let path = path.as_ref();
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        return Err(BuildwebError::ConfigError(format!(
            "{} cannot be a directory",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse project TOML held in memory.
pub fn parse_str(contents: &str) -> Result<RawProjectConfig> {
    let config: RawProjectConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Load a project file from path and run validation.
///
/// This is the entry point used at startup and by the hot-reload path:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks package identity, entry name uniqueness, and `externals`
///   references.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let raw_config = load_from_path(&path)?;
    let config = ProjectConfig::try_from(raw_config)?;
    Ok(config)
}

/// Default project file location.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("project.toml")
}

/// Project root for a given project file path.
///
/// - If the path has a non-empty parent (e.g. "web/project.toml"), that
///   directory is the root.
/// - For a bare filename like "project.toml" we fall back to the current
///   working directory.
pub fn project_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
