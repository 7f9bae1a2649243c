// src/engine/core.rs

//! Pure worker bookkeeping.
//!
//! [`WorkerCore`] decides *what* the worker does with a task, without any
//! Tokio types, processes, or filesystem access:
//! - how an "all entries" asset task expands into per-entry tasks
//! - which failures are outstanding
//! - whether a restart is allowed
//!
//! The async shell in `engine::runtime` feeds it outcomes and asks it for
//! decisions.

use std::collections::HashMap;

use crate::config::ProjectConfig;
use crate::engine::{Task, TaskKind};

/// A failed task and the error it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: Task,
    pub message: String,
}

/// How the worker should execute a single queued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run the task body once.
    Single(Task),
    /// Reset the category's output directory, then run the task once per
    /// configured entry.
    Category { kind: TaskKind, entries: Vec<String> },
    /// Kill and start the managed process, if no failure is outstanding.
    Restart,
}

/// Pure worker state.
///
/// Restart gating uses a failure ledger: a failure stays outstanding until
/// the same task (or a rebuild of its whole category) succeeds, or until the
/// configuration no longer has the entry or test module it was about. A
/// broken asset keeps blocking restarts even when a later binary build in the
/// same or a following batch passes.
#[derive(Debug, Default)]
pub struct WorkerCore {
    failures: HashMap<Task, String>,
}

impl WorkerCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, task: &Task, config: &ProjectConfig) -> Plan {
        if task.kind == TaskKind::RestartBinary {
            return Plan::Restart;
        }
        if task.kind.is_asset_category() && task.is_all() {
            return Plan::Category {
                kind: task.kind,
                entries: config.entry_names(),
            };
        }
        Plan::Single(task.clone())
    }

    /// Record the outcome of `task`.
    pub fn record(&mut self, task: &Task, outcome: std::result::Result<(), String>) {
        match outcome {
            Ok(()) => {
                if task.is_all() || task.kind == TaskKind::BuildBinary {
                    // The whole category (or the one package binary) was rebuilt.
                    self.failures.retain(|failed, _| failed.kind != task.kind);
                } else {
                    self.failures.remove(task);
                }
            }
            Err(message) => {
                self.failures.insert(task.clone(), message);
            }
        }
    }

    /// `Ok` when a restart may proceed, otherwise the outstanding failures.
    pub fn restart_gate(&self) -> std::result::Result<(), Vec<TaskFailure>> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.outstanding())
        }
    }

    /// Outstanding failures in stage order.
    pub fn outstanding(&self) -> Vec<TaskFailure> {
        let mut failures: Vec<TaskFailure> = self
            .failures
            .iter()
            .map(|(task, message)| TaskFailure {
                task: task.clone(),
                message: message.clone(),
            })
            .collect();
        failures.sort_by(|a, b| {
            a.task
                .kind
                .priority()
                .cmp(&b.task.kind.priority())
                .then_with(|| a.task.target.cmp(&b.task.target))
        });
        failures
    }

    /// Drop failures that no longer apply under `config` and return them.
    ///
    /// Asset failures go when their entry is gone and test failures when
    /// their module is omitted. Every other failure is kept unless
    /// `is_current` rejects it.
    pub fn forget_stale(&mut self, config: &ProjectConfig, mut is_current: impl FnMut(&Task) -> bool) -> Vec<Task> {
        let entries = config.entry_names();
        let mut forgotten = Vec::new();
        self.failures.retain(|task, _| {
            let current = if task.kind.is_asset_category() && !task.is_all() {
                entries.contains(&task.target)
            } else if task.kind == TaskKind::RunBinaryTests && config.omits_tests(&task.target) {
                false
            } else {
                is_current(task)
            };
            if !current {
                forgotten.push(task.clone());
            }
            current
        });
        forgotten.sort_by_key(|task| (task.kind.priority(), task.target.clone()));
        forgotten
    }
}
