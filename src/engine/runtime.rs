// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigDiff, ConfigStore, ProjectConfig};
use crate::errors::{BuildwebError, Result};

use super::core::{Plan, TaskFailure, WorkerCore};
use super::handler::{DependencyChanges, TaskHandler};
use super::queue::PendingQueue;
use super::{Task, TaskKind};

/// Period of the debounce flush for watcher-accumulated tasks.
pub const DEBOUNCE_PERIOD: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub flush_period: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            flush_period: DEBOUNCE_PERIOD,
        }
    }
}

#[derive(Debug)]
enum Submission {
    Batch(Vec<Task>),
    Reload(Box<ProjectConfig>),
    Shutdown,
}

/// Producer side of the scheduler.
///
/// Direct submissions (startup, console) are executed as soon as the worker
/// is free. Watcher submissions are accumulated and flushed as one batch on
/// each debounce tick.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    direct: mpsc::UnboundedSender<Submission>,
    watched: mpsc::UnboundedSender<Vec<Task>>,
}

impl SchedulerHandle {
    /// Submit `tasks` followed by the restart sentinel.
    pub fn execute_and_restart(&self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        let mut queue = PendingQueue::from_tasks(tasks);
        queue.push(Task::restart());
        self.send_direct(Submission::Batch(queue.drain()))
    }

    /// Submit `tasks` without a restart.
    pub fn execute(&self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        let batch = PendingQueue::from_tasks(tasks).drain();
        self.send_direct(Submission::Batch(batch))
    }

    /// Add watcher-classified tasks to the next debounce flush.
    pub fn accumulate(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        self.watched.send(tasks).map_err(|_| worker_stopped())
    }

    /// Hand a freshly validated project file to the worker.
    ///
    /// The worker diffs it against the current snapshot once it is free,
    /// installs changed dependencies, publishes it, and runs the rebuild the
    /// diff calls for. A failed install keeps the current snapshot.
    pub fn reload(&self, config: ProjectConfig) -> Result<()> {
        self.send_direct(Submission::Reload(Box::new(config)))
    }

    /// Ask the worker to stop once the current task (if any) finishes.
    pub fn shutdown(&self) -> Result<()> {
        self.send_direct(Submission::Shutdown)
    }

    fn send_direct(&self, submission: Submission) -> Result<()> {
        self.direct.send(submission).map_err(|_| worker_stopped())
    }
}

fn worker_stopped() -> BuildwebError {
    BuildwebError::Other(anyhow::anyhow!("scheduler worker has stopped"))
}

/// The single worker that executes build tasks.
///
/// Exactly one task body runs at a time, so external tools never race on the
/// same output directories. Task batches are processed in arrival order and
/// each batch in stage order.
pub struct Scheduler<H: TaskHandler> {
    core: WorkerCore,
    handler: H,
    config: ConfigStore,
    direct_rx: mpsc::UnboundedReceiver<Submission>,
    watched_rx: mpsc::UnboundedReceiver<Vec<Task>>,
    pending: PendingQueue,
    options: SchedulerOptions,
}

impl<H: TaskHandler> fmt::Debug for Scheduler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("core", &self.core)
            .field("pending", &self.pending)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<H: TaskHandler> Scheduler<H> {
    pub fn new(handler: H, config: ConfigStore, options: SchedulerOptions) -> (Self, SchedulerHandle) {
        let (direct_tx, direct_rx) = mpsc::unbounded_channel();
        let (watched_tx, watched_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            core: WorkerCore::new(),
            handler,
            config,
            direct_rx,
            watched_rx,
            pending: PendingQueue::new(),
            options,
        };
        let handle = SchedulerHandle {
            direct: direct_tx,
            watched: watched_tx,
        };
        (scheduler, handle)
    }

    /// Main worker loop.
    ///
    /// Runs until a shutdown is requested or every handle is dropped, then
    /// shuts the handler down and returns the failures still outstanding.
    pub async fn run(mut self) -> Result<Vec<TaskFailure>> {
        info!(
            flush_ms = self.options.flush_period.as_millis() as u64,
            "scheduler worker started"
        );

        let mut ticker = tokio::time::interval(self.options.flush_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watched_open = true;

        loop {
            tokio::select! {
                biased;

                submission = self.direct_rx.recv() => match submission {
                    Some(Submission::Batch(tasks)) => self.execute_batch(tasks).await,
                    Some(Submission::Reload(config)) => self.apply_config(*config).await,
                    Some(Submission::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    None => {
                        info!("all scheduler handles dropped; stopping worker");
                        break;
                    }
                },

                tasks = self.watched_rx.recv(), if watched_open => match tasks {
                    Some(tasks) => {
                        debug!(count = tasks.len(), "accumulating watched tasks");
                        self.pending.extend(tasks);
                    }
                    None => watched_open = false,
                },

                _ = ticker.tick() => self.flush().await,
            }
        }

        if let Err(err) = self.handler.shutdown().await {
            warn!(error = %err, "handler shutdown reported an error");
        }
        let config = self.config.snapshot();
        self.forget_stale(&config);

        info!("scheduler worker exiting");
        Ok(self.core.outstanding())
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut batch = self.pending.drain();
        batch.push(Task::restart());
        self.execute_batch(batch).await;
    }

    async fn apply_config(&mut self, new: ProjectConfig) {
        let old = self.config.snapshot();
        let diff = ConfigDiff::between(&old, &new);
        let new = Arc::new(new);

        let changes = DependencyChanges {
            package: diff.package_deps_changed,
            assets: diff.assets_deps_changed,
        };
        if changes.any() {
            info!(?changes, "installing changed dependencies");
            if let Err(err) = self.handler.install_dependencies(changes, Arc::clone(&new)).await {
                error!(error = %err, "dependency install failed; keeping previous configuration");
                return;
            }
        }

        self.config.replace(new);
        if diff.is_empty() {
            debug!("project file reloaded; nothing to rebuild");
            return;
        }
        info!(?diff, "project file reloaded");
        self.execute_batch(diff.tasks()).await;
    }

    async fn execute_batch(&mut self, tasks: Vec<Task>) {
        let batch = PendingQueue::from_tasks(tasks).drain();
        if batch.is_empty() {
            return;
        }

        let labels: Vec<String> = batch.iter().map(|t| t.to_string()).collect();
        info!(tasks = ?labels, "executing task batch");

        for task in batch {
            self.execute_task(task).await;
        }
    }

    async fn execute_task(&mut self, task: Task) {
        let config = self.config.snapshot();

        match self.core.plan(&task, &config) {
            Plan::Restart => self.restart(config).await,
            Plan::Single(task) => {
                let outcome = self.handler.run_task(task.clone(), config).await;
                if let Err(BuildwebError::EntryNotFound(name)) = &outcome {
                    info!(%task, entry = %name, "entry has no sources in this category; nothing to build");
                    self.finish(&task, Ok(()));
                } else {
                    self.finish(&task, outcome);
                }
            }
            Plan::Category { kind, entries } => self.run_category(kind, entries, config).await,
        }
    }

    async fn run_category(&mut self, kind: TaskKind, entries: Vec<String>, config: Arc<ProjectConfig>) {
        let all = Task::all(kind);
        if let Err(err) = self.handler.reset_category(kind).await {
            self.finish(&all, Err(err));
            return;
        }
        self.finish(&all, Ok(()));

        for entry in entries {
            let task = Task::new(kind, entry);
            match self.handler.run_task(task.clone(), Arc::clone(&config)).await {
                Err(BuildwebError::EntryNotFound(name)) => {
                    debug!(%task, entry = %name, "entry has no sources in this category; skipping");
                    self.finish(&task, Ok(()));
                }
                outcome => self.finish(&task, outcome),
            }
        }
    }

    async fn restart(&mut self, config: Arc<ProjectConfig>) {
        self.forget_stale(&config);
        match self.core.restart_gate() {
            Ok(()) => {
                if let Err(err) = self.handler.restart_binary(config).await {
                    warn!(error = %err, "failed to restart application");
                }
            }
            Err(failures) => {
                warn!(
                    outstanding = failures.len(),
                    "skipping application restart; fix the errors first"
                );
                for failure in failures {
                    warn!(task = %failure.task, error = %failure.message, "outstanding failure");
                }
            }
        }
    }

    fn forget_stale(&mut self, config: &ProjectConfig) {
        let handler = &self.handler;
        for task in self.core.forget_stale(config, |task| handler.is_current(task, config)) {
            info!(%task, "forgetting failure that no longer applies");
        }
    }

    fn finish(&mut self, task: &Task, outcome: Result<()>) {
        match &outcome {
            Ok(()) => debug!(%task, "task finished"),
            Err(err) => error!(%task, error = %err, "task failed"),
        }
        self.core.record(task, outcome.map_err(|e| e.to_string()));
    }
}
