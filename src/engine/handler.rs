// src/engine/handler.rs

//! Pluggable task handler abstraction.
//!
//! The worker talks to a `TaskHandler` instead of invoking tools directly.
//! Production code uses `build::BuildHandler`, which shells out to the
//! compiler and asset tools and owns the process supervisor; tests provide a
//! recording fake that never spawns anything.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::engine::{Task, TaskKind};
use crate::errors::Result;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Dependency lists that differ between the running and a reloaded project
/// file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyChanges {
    /// `[package].deps`, installed with the compiler toolchain.
    pub package: bool,
    /// `[assets].deps`, installed with the package installer.
    pub assets: bool,
}

impl DependencyChanges {
    pub fn any(self) -> bool {
        self.package || self.assets
    }
}

pub trait TaskHandler: Send {
    /// Install the dependency lists flagged in `changes` for `config`. Runs
    /// on the worker before `config` is published.
    fn install_dependencies(&mut self, changes: DependencyChanges, config: Arc<ProjectConfig>) -> HandlerFuture<'_>;

    /// Remove and recreate the output directory of an asset category before
    /// every entry in it is rebuilt.
    fn reset_category(&mut self, kind: TaskKind) -> HandlerFuture<'_>;

    /// Run one concrete task. Asset tasks always carry an entry name here.
    fn run_task(&mut self, task: Task, config: Arc<ProjectConfig>) -> HandlerFuture<'_>;

    /// Stop the managed process (if any) and start it again.
    fn restart_binary(&mut self, config: Arc<ProjectConfig>) -> HandlerFuture<'_>;

    /// Called once when the worker stops.
    fn shutdown(&mut self) -> HandlerFuture<'_>;

    /// Whether a recorded failure of `task` still refers to something on
    /// disk. Checks that only need `config` are done by the worker itself.
    fn is_current(&self, _task: &Task, _config: &ProjectConfig) -> bool {
        true
    }
}
