// src/assets/mod.rs

//! Asset pipeline.
//!
//! Each asset category has a driver that turns `assets/<category>/...`
//! sources into fingerprinted files under `public/<category>/`:
//!
//! - [`images`] copies entry images and packs [`sprite`] atlases.
//! - [`styles`] runs the stylesheet preprocessor or copies plain CSS.
//! - [`scripts`] runs the bundler.
//!
//! [`fingerprint`] names the outputs, [`mapping`] indexes them for the
//! application, and [`incremental`] lets unchanged entries be skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::engine::TaskKind;
use crate::errors::Result;
use crate::exec::{ToolCommand, Toolchain};

pub mod fingerprint;
pub mod images;
pub mod incremental;
pub mod mapping;
pub mod scripts;
pub mod sprite;
pub mod styles;

pub const SOURCE_ROOT: &str = "assets";
pub const OUTPUT_ROOT: &str = "public";
/// Orchestrator state inside the project root.
pub const STATE_DIR: &str = ".buildweb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Images,
    Stylesheets,
    JavaScripts,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Images, AssetKind::Stylesheets, AssetKind::JavaScripts];

    /// Directory name under both `assets/` and `public/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Images => "images",
            AssetKind::Stylesheets => "stylesheets",
            AssetKind::JavaScripts => "javascripts",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.dir_name() == name)
    }

    pub fn task_kind(self) -> TaskKind {
        match self {
            AssetKind::Images => TaskKind::BuildImages,
            AssetKind::Stylesheets => TaskKind::BuildStyles,
            AssetKind::JavaScripts => TaskKind::BuildJavaScripts,
        }
    }

    pub fn from_task_kind(kind: TaskKind) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.task_kind() == kind)
    }
}

/// Per-invocation settings shared by every driver.
#[derive(Debug, Clone)]
pub struct AssetContext {
    pub root: PathBuf,
    pub production: bool,
    pub toolchain: Toolchain,
}

impl AssetContext {
    pub fn new(root: impl Into<PathBuf>, production: bool, toolchain: Toolchain) -> Self {
        Self {
            root: root.into(),
            production,
            toolchain,
        }
    }

    /// `<root>/assets/<category>`
    pub fn source_dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(SOURCE_ROOT).join(kind.dir_name())
    }

    /// `<root>/public/<category>`
    pub fn output_dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(OUTPUT_ROOT).join(kind.dir_name())
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn node_env(&self) -> &'static str {
        if self.production {
            "production"
        } else {
            "development"
        }
    }

    /// A node tool invocation run from the project root with `NODE_PATH`
    /// and `NODE_ENV` set.
    pub fn node_tool(&self, tool: &str, program: &Path) -> ToolCommand {
        let node_modules = self.root.join("node_modules");
        let node_path = match std::env::var("NODE_PATH") {
            Ok(existing) if !existing.is_empty() => format!("{existing}:{}", node_modules.display()),
            _ => node_modules.display().to_string(),
        };
        ToolCommand::new(tool, Toolchain::resolve(&self.root, program))
            .current_dir(&self.root)
            .env("NODE_PATH", node_path)
            .env("NODE_ENV", self.node_env())
    }
}

/// Remove `dir` and everything in it, then recreate it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("cannot clean {:?}", dir))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("cannot create {:?}", dir))?;
    Ok(())
}

/// Relative path with forward slashes, used for logical asset names.
pub(crate) fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
