// src/engine/mod.rs

//! Build orchestration engine.
//!
//! This module ties together:
//! - the task model ([`Task`], [`TaskKind`]) and its explicit stage order
//! - the deduplicating, stage-ordered [`PendingQueue`]
//! - the pure worker bookkeeping in [`core`] (failure ledger, restart gate,
//!   category expansion)
//! - the single async worker in [`runtime`] that receives batches from the
//!   console, the watcher's debounce flush, startup and project file
//!   reloads, and runs them one task at a time through a [`TaskHandler`].

use std::fmt;

pub mod core;
pub mod handler;
pub mod queue;
pub mod runtime;

pub use core::{TaskFailure, WorkerCore};
pub use handler::{DependencyChanges, HandlerFuture, TaskHandler};
pub use queue::PendingQueue;
pub use runtime::{Scheduler, SchedulerHandle, SchedulerOptions};

/// Kind of build step.
///
/// Declaration order carries no meaning; execution priority comes from
/// [`STAGE_ORDER`] via [`TaskKind::priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    BuildImages,
    BuildStyles,
    BuildJavaScripts,
    RegenerateAssetsMapping,
    RunBinaryTests,
    BuildBinary,
    RestartBinary,
}

/// Execution order of stages: assets, then the mapping that indexes them,
/// then tests and the binary, then the restart that consumes all of it.
pub const STAGE_ORDER: [TaskKind; 7] = [
    TaskKind::BuildImages,
    TaskKind::BuildStyles,
    TaskKind::BuildJavaScripts,
    TaskKind::RegenerateAssetsMapping,
    TaskKind::RunBinaryTests,
    TaskKind::BuildBinary,
    TaskKind::RestartBinary,
];

impl TaskKind {
    /// Position in [`STAGE_ORDER`]; lower runs first.
    pub fn priority(self) -> usize {
        STAGE_ORDER
            .iter()
            .position(|k| *k == self)
            .unwrap_or(STAGE_ORDER.len())
    }

    /// Whether an empty target means "every configured asset entry".
    pub fn is_asset_category(self) -> bool {
        matches!(
            self,
            TaskKind::BuildImages | TaskKind::BuildStyles | TaskKind::BuildJavaScripts
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskKind::BuildImages => "images",
            TaskKind::BuildStyles => "styles",
            TaskKind::BuildJavaScripts => "javascripts",
            TaskKind::RegenerateAssetsMapping => "assets-mapping",
            TaskKind::RunBinaryTests => "tests",
            TaskKind::BuildBinary => "binary",
            TaskKind::RestartBinary => "restart",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit of work for the scheduler.
///
/// `target` is an asset entry name, a module path, or empty for "all
/// entries" / "whole category".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub kind: TaskKind,
    pub target: String,
}

impl Task {
    pub fn new(kind: TaskKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    /// Task covering the whole category.
    pub fn all(kind: TaskKind) -> Self {
        Self::new(kind, "")
    }

    /// The restart sentinel.
    pub fn restart() -> Self {
        Self::all(TaskKind::RestartBinary)
    }

    pub fn is_all(&self) -> bool {
        self.target.is_empty()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}[{}]", self.kind, self.target)
        }
    }
}

/// Tasks for a complete build of every asset category, the mapping and the
/// binary.
pub fn full_build_tasks() -> Vec<Task> {
    vec![
        Task::all(TaskKind::BuildImages),
        Task::all(TaskKind::BuildStyles),
        Task::all(TaskKind::BuildJavaScripts),
        Task::all(TaskKind::RegenerateAssetsMapping),
        Task::all(TaskKind::BuildBinary),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_stage_order_table() {
        let priorities: Vec<usize> = STAGE_ORDER.iter().map(|k| k.priority()).collect();
        assert_eq!(priorities, (0..STAGE_ORDER.len()).collect::<Vec<_>>());
        assert!(TaskKind::BuildJavaScripts.priority() < TaskKind::RegenerateAssetsMapping.priority());
        assert!(TaskKind::BuildBinary.priority() < TaskKind::RestartBinary.priority());
    }

    #[test]
    fn display_includes_target_when_present() {
        assert_eq!(Task::new(TaskKind::BuildStyles, "home").to_string(), "styles[home]");
        assert_eq!(Task::restart().to_string(), "restart");
    }
}
