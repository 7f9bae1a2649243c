use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use buildweb::config::ProjectConfig;
use buildweb::engine::{DependencyChanges, HandlerFuture, Task, TaskHandler, TaskKind};
use buildweb::errors::BuildwebError;

/// Something the worker asked the handler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerEvent {
    Installed(DependencyChanges),
    Reset(TaskKind),
    Ran(Task),
    Restarted,
    Shutdown,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<HandlerEvent>,
    failing: HashSet<Task>,
    failing_kinds: HashSet<TaskKind>,
    missing: HashSet<Task>,
    failing_installs: bool,
}

/// A fake task handler that:
/// - records every install, reset, task, restart and shutdown in order
/// - fails the tasks (or kinds, or installs) it is told to, with a tool
///   failure
/// - reports `EntryNotFound` for tasks marked missing.
///
/// Clones share state, so a test keeps one clone and hands the other to the
/// scheduler.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    state: Arc<Mutex<State>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn fail(&self, task: Task) {
        self.state().failing.insert(task);
    }

    pub fn fail_kind(&self, kind: TaskKind) {
        self.state().failing_kinds.insert(kind);
    }

    pub fn fail_installs(&self) {
        self.state().failing_installs = true;
    }

    /// Stop failing everything.
    pub fn heal(&self) {
        let mut state = self.state();
        state.failing.clear();
        state.failing_kinds.clear();
        state.failing_installs = false;
    }

    pub fn missing(&self, task: Task) {
        self.state().missing.insert(task);
    }

    pub fn events(&self) -> Vec<HandlerEvent> {
        self.state().events.clone()
    }

    pub fn ran(&self) -> Vec<Task> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                HandlerEvent::Ran(task) => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn restarts(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| **e == HandlerEvent::Restarted)
            .count()
    }

    pub fn clear(&self) {
        self.state().events.clear();
    }

    fn record(&self, event: HandlerEvent) {
        self.state().events.push(event);
    }

    fn outcome(&self, task: &Task) -> buildweb::errors::Result<()> {
        let state = self.state();
        if state.missing.contains(task) {
            return Err(BuildwebError::EntryNotFound(task.target.clone()));
        }
        if state.failing.contains(task) || state.failing_kinds.contains(&task.kind) {
            return Err(BuildwebError::ToolFailed {
                tool: task.kind.label().to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("{task} failed"),
            });
        }
        Ok(())
    }
}

impl TaskHandler for RecordingHandler {
    fn install_dependencies(&mut self, changes: DependencyChanges, _config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        self.record(HandlerEvent::Installed(changes));
        let outcome = if self.state().failing_installs {
            Err(BuildwebError::ToolFailed {
                tool: "npm install".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "404 Not Found".to_string(),
            })
        } else {
            Ok(())
        };
        Box::pin(async move { outcome })
    }

    fn reset_category(&mut self, kind: TaskKind) -> HandlerFuture<'_> {
        self.record(HandlerEvent::Reset(kind));
        Box::pin(async { Ok(()) })
    }

    fn run_task(&mut self, task: Task, _config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        self.record(HandlerEvent::Ran(task.clone()));
        let outcome = self.outcome(&task);
        Box::pin(async move { outcome })
    }

    fn restart_binary(&mut self, _config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        self.record(HandlerEvent::Restarted);
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&mut self) -> HandlerFuture<'_> {
        self.record(HandlerEvent::Shutdown);
        Box::pin(async { Ok(()) })
    }
}
