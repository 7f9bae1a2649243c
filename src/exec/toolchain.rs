// src/exec/toolchain.rs

use std::path::{Path, PathBuf};

pub const GO_ENV_VAR: &str = "BUILDWEB_GO";
pub const NPM_ENV_VAR: &str = "BUILDWEB_NPM";
pub const STYLUS_ENV_VAR: &str = "BUILDWEB_STYLUS";
pub const BROWSERIFY_ENV_VAR: &str = "BUILDWEB_BROWSERIFY";

/// Locations of the external tools.
///
/// Bare names (`go`, `npm`) are looked up on `PATH`. Relative paths with more
/// than one component are resolved against the project root, which is where
/// `npm install` puts the asset tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub go: PathBuf,
    pub npm: PathBuf,
    pub stylus: PathBuf,
    pub browserify: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            go: PathBuf::from("go"),
            npm: PathBuf::from("npm"),
            stylus: PathBuf::from("node_modules/stylus/bin/stylus"),
            browserify: PathBuf::from("node_modules/browserify/bin/cmd.js"),
        }
    }
}

impl Toolchain {
    /// Defaults, overridden by `BUILDWEB_GO`, `BUILDWEB_NPM`,
    /// `BUILDWEB_STYLUS` and `BUILDWEB_BROWSERIFY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            go: env_path(GO_ENV_VAR).unwrap_or(defaults.go),
            npm: env_path(NPM_ENV_VAR).unwrap_or(defaults.npm),
            stylus: env_path(STYLUS_ENV_VAR).unwrap_or(defaults.stylus),
            browserify: env_path(BROWSERIFY_ENV_VAR).unwrap_or(defaults.browserify),
        }
    }

    /// Resolve `tool` for a project rooted at `root`.
    pub fn resolve(root: &Path, tool: &Path) -> PathBuf {
        if tool.is_absolute() || tool.components().count() <= 1 {
            tool.to_path_buf()
        } else {
            root.join(tool)
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
