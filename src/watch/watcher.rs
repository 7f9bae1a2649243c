// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigStore, load_and_validate};
use crate::engine::SchedulerHandle;
use crate::fs::FileSystem;

use super::classify::{ChangeClassifier, Classification};
use super::path_utils::{is_ignored, relative_str};

/// Handle for the filesystem watcher.
///
/// The `RecommendedWatcher` lives inside the event task, which needs it to
/// add and remove directory watches. Dropping this handle stops watching.
pub struct WatcherHandle {
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Every directory under `root` (root included) outside the ignore list,
/// parents before children.
pub fn collect_watch_dirs(fs: &dyn FileSystem, root: &Path) -> Vec<PathBuf> {
    collect_dirs_below(fs, root, root)
}

fn collect_dirs_below(fs: &dyn FileSystem, root: &Path, start: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut stack = vec![start.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if dir != root {
            match relative_str(root, &dir) {
                Some(rel) if !is_ignored(&rel) => {}
                _ => continue,
            }
        }
        match fs.read_dir(&dir) {
            Ok(entries) => {
                // Reverse so the stack pops children in sorted order.
                stack.extend(entries.into_iter().filter(|p| fs.is_dir(p)).rev());
            }
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        }
        dirs.push(dir);
    }
    dirs
}

/// Watch every project directory non-recursively and forward classified
/// changes to the scheduler.
///
/// Asset and source changes are accumulated for the debounce flush. A
/// changed project file is parsed and validated here and handed to the
/// worker, which installs dependencies, publishes it and rebuilds. A file
/// that does not validate is logged and the previous configuration stays
/// active.
pub fn spawn_watcher(
    classifier: ChangeClassifier,
    fs: Arc<dyn FileSystem>,
    store: ConfigStore,
    scheduler: SchedulerHandle,
) -> Result<WatcherHandle> {
    let root = classifier.root().to_path_buf();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("buildweb: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("buildweb: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    let mut watched = BTreeSet::new();
    for dir in collect_watch_dirs(fs.as_ref(), &root) {
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        watched.insert(dir);
    }
    info!(root = %root.display(), dirs = watched.len(), "file watcher started");

    let pump = EventPump {
        root,
        watcher,
        watched,
        classifier,
        fs,
        store,
        scheduler,
    };
    let task = tokio::spawn(pump.run(event_rx));

    Ok(WatcherHandle { task })
}

struct EventPump {
    root: PathBuf,
    watcher: RecommendedWatcher,
    watched: BTreeSet<PathBuf>,
    classifier: ChangeClassifier,
    fs: Arc<dyn FileSystem>,
    store: ConfigStore,
    scheduler: SchedulerHandle,
}

impl EventPump {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths.iter() {
                self.track_directory(&event.kind, path);
                if !self.handle_path(path) {
                    debug!("scheduler has stopped; watcher event loop exiting");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    }

    fn track_directory(&mut self, kind: &EventKind, path: &Path) {
        match kind {
            EventKind::Create(_) if self.fs.is_dir(path) => {
                for dir in collect_dirs_below(self.fs.as_ref(), &self.root, path) {
                    if self.watched.contains(&dir) {
                        continue;
                    }
                    match self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                        Ok(()) => {
                            debug!(dir = %dir.display(), "watching new directory");
                            self.watched.insert(dir);
                        }
                        Err(err) => warn!(dir = %dir.display(), error = %err, "failed to watch directory"),
                    }
                }
            }
            EventKind::Remove(_) | EventKind::Modify(notify::event::ModifyKind::Name(_))
                if !self.fs.exists(path) =>
            {
                let gone: Vec<PathBuf> = self
                    .watched
                    .iter()
                    .filter(|dir| dir.starts_with(path))
                    .cloned()
                    .collect();
                for dir in gone {
                    // The OS usually drops the watch itself; ignore errors.
                    let _ = self.watcher.unwatch(&dir);
                    self.watched.remove(&dir);
                    debug!(dir = %dir.display(), "stopped watching removed directory");
                }
            }
            _ => {}
        }
    }

    /// Returns `false` once the scheduler is gone.
    fn handle_path(&mut self, path: &Path) -> bool {
        let config = self.store.snapshot();
        match self.classifier.classify(path, &config) {
            Classification::Ignored => true,
            Classification::Tasks(tasks) => {
                debug!(path = %path.display(), count = tasks.len(), "change classified");
                self.scheduler.accumulate(tasks).is_ok()
            }
            Classification::ConfigChanged => match load_and_validate(self.classifier.config_path()) {
                Ok(config) => {
                    info!("project file changed; handing it to the worker");
                    self.scheduler.reload(config).is_ok()
                }
                Err(err) => {
                    error!(error = %err, "project file reload failed; keeping previous configuration");
                    true
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn watch_dirs_skip_ignored_trees() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/main.go", "package main");
        fs.add_file("/proj/handlers/user.go", "package handlers");
        fs.add_file("/proj/assets/images/home/logo.png", "png");
        fs.add_file("/proj/node_modules/stylus/index.js", "js");
        fs.add_file("/proj/public/images/home/fpab-logo.png", "png");
        fs.add_dir("/proj/.git/objects");

        let dirs = collect_watch_dirs(&fs, Path::new("/proj"));

        let expected: Vec<PathBuf> = [
            "/proj",
            "/proj/assets",
            "/proj/assets/images",
            "/proj/assets/images/home",
            "/proj/handlers",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn new_subtree_is_collected_from_its_top() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/assets/stylesheets/admin/partials");

        let dirs = collect_dirs_below(&fs, Path::new("/proj"), Path::new("/proj/assets/stylesheets/admin"));

        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/proj/assets/stylesheets/admin"),
                PathBuf::from("/proj/assets/stylesheets/admin/partials"),
            ]
        );
    }
}
