// src/config/snapshot.rs

//! Versioned configuration snapshots.
//!
//! The worker and the asset drivers never hold a lock while building: they
//! take an `Arc<ProjectConfig>` snapshot per task. The hot-reload path
//! publishes a replacement with a single `send_replace`, so readers always
//! see either the old or the new configuration as a whole.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::model::ProjectConfig;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<Arc<ProjectConfig>>>,
}

impl ConfigStore {
    pub fn new(config: ProjectConfig) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { tx: Arc::new(tx) }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<ProjectConfig> {
        Arc::clone(&self.tx.borrow())
    }

    /// Publish `config` as the new snapshot and return the one it replaced.
    pub fn replace(&self, config: impl Into<Arc<ProjectConfig>>) -> Arc<ProjectConfig> {
        self.tx.send_replace(config.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::PackageConfig;

    fn config(name: &str) -> ProjectConfig {
        ProjectConfig::new_unchecked(
            PackageConfig {
                name: name.to_string(),
                ..PackageConfig::default()
            },
            None,
            None,
        )
    }

    #[test]
    fn old_snapshots_stay_valid_after_replace() {
        let store = ConfigStore::new(config("first"));
        let before = store.snapshot();

        let replaced = store.replace(config("second"));

        assert_eq!(replaced.package.name, "first");
        assert_eq!(before.package.name, "first");
        assert_eq!(store.snapshot().package.name, "second");
    }

    #[test]
    fn clones_share_the_published_snapshot() {
        let store = ConfigStore::new(config("first"));
        let reader = store.clone();

        store.replace(Arc::new(config("second")));

        assert_eq!(reader.snapshot().package.name, "second");
    }
}
