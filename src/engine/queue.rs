// src/engine/queue.rs

use tracing::debug;

use super::Task;

/// Ordered set of pending tasks.
///
/// Semantics:
/// - At most one task per `(kind, target)` pair. Re-inserting a pending pair
///   is a no-op and does not move it.
/// - A new pair is spliced in front of the first pending task with a higher
///   stage priority, so the queue stays sorted by stage while tasks of the
///   same stage keep their arrival order.
/// - [`PendingQueue::drain`] empties the queue in one step.
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    tasks: Vec<Task>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Build a normalised queue from an arbitrary list of tasks.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut queue = Self::new();
        queue.extend(tasks);
        queue
    }

    /// Insert `task`; returns `false` if the same pair was already pending.
    pub fn push(&mut self, task: Task) -> bool {
        if self.tasks.contains(&task) {
            debug!(%task, "task already pending; ignoring duplicate");
            return false;
        }

        let priority = task.kind.priority();
        match self
            .tasks
            .iter()
            .position(|pending| pending.kind.priority() > priority)
        {
            Some(idx) => self.tasks.insert(idx, task),
            None => self.tasks.push(task),
        }
        true
    }

    pub fn extend(&mut self, tasks: impl IntoIterator<Item = Task>) {
        for task in tasks {
            self.push(task);
        }
    }

    /// Take every pending task, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}
