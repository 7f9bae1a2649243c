// src/config/diff.rs

//! Old-vs-new comparison used by the hot-reload path.
//!
//! The diff decides how much work a project file edit causes: nothing, a
//! dependency reinstall, a rebuild of a few asset entries, a full asset
//! rebuild, or a binary rebuild and restart.

use std::collections::BTreeMap;

use crate::config::model::{AssetEntry, AssetsConfig, PackageConfig, ProjectConfig};
use crate::engine::{Task, TaskKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Package identity or launch parameters changed; rebuild and restart.
    pub package_changed: bool,
    /// `[package].deps` changed; reinstall with the compiler toolchain.
    pub package_deps_changed: bool,
    /// `[assets].deps` changed; reinstall with the package installer.
    pub assets_deps_changed: bool,
    /// Asset-wide settings changed; every asset category is rebuilt.
    pub assets_settings_changed: bool,
    /// Added or modified entries, in new-config order.
    pub changed_entries: Vec<String>,
    /// Entries that no longer exist; only the mapping is regenerated.
    pub removed_entries: Vec<String>,
}

impl ConfigDiff {
    pub fn between(old: &ProjectConfig, new: &ProjectConfig) -> Self {
        let package_changed = package_identity_changed(&old.package, &new.package);
        let package_deps_changed = old.package.dependencies != new.package.dependencies;
        let assets_deps_changed = old.asset_dependencies() != new.asset_dependencies();
        let assets_settings_changed = assets_settings_changed(old.assets.as_ref(), new.assets.as_ref());

        let old_entries: BTreeMap<&str, &AssetEntry> =
            old.asset_entries().map(|e| (e.name.as_str(), e)).collect();
        let new_names: Vec<&str> = new.asset_entries().map(|e| e.name.as_str()).collect();

        let changed_entries = new
            .asset_entries()
            .filter(|entry| old_entries.get(entry.name.as_str()).copied() != Some(*entry))
            .map(|entry| entry.name.clone())
            .collect();

        let removed_entries = old
            .asset_entries()
            .filter(|entry| !new_names.contains(&entry.name.as_str()))
            .map(|entry| entry.name.clone())
            .collect();

        Self {
            package_changed,
            package_deps_changed,
            assets_deps_changed,
            assets_settings_changed,
            changed_entries,
            removed_entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Scheduler tasks implied by this diff, restart sentinel included when
    /// anything needs rebuilding.
    pub fn tasks(&self) -> Vec<Task> {
        let mut tasks = Vec::new();

        if self.assets_settings_changed || self.assets_deps_changed {
            tasks.push(Task::all(TaskKind::BuildImages));
            tasks.push(Task::all(TaskKind::BuildStyles));
            tasks.push(Task::all(TaskKind::BuildJavaScripts));
            tasks.push(Task::all(TaskKind::RegenerateAssetsMapping));
        } else {
            for name in self.changed_entries.iter() {
                tasks.push(Task::new(TaskKind::BuildImages, name.as_str()));
                tasks.push(Task::new(TaskKind::BuildStyles, name.as_str()));
                tasks.push(Task::new(TaskKind::BuildJavaScripts, name.as_str()));
            }
            if !self.changed_entries.is_empty() || !self.removed_entries.is_empty() {
                tasks.push(Task::all(TaskKind::RegenerateAssetsMapping));
            }
        }

        if self.package_changed || self.package_deps_changed {
            tasks.push(Task::all(TaskKind::BuildBinary));
        }

        if !tasks.is_empty() {
            tasks.push(Task::restart());
        }
        tasks
    }
}

fn package_identity_changed(old: &PackageConfig, new: &PackageConfig) -> bool {
    old.name != new.name
        || old.version != new.version
        || old.build_opts != new.build_opts
        || old.omit_tests != new.omit_tests
        || old.graceful != new.graceful
        || old.args != new.args
        || old.env != new.env
}

fn assets_settings_changed(old: Option<&AssetsConfig>, new: Option<&AssetsConfig>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(old), Some(new)) => {
            old.url_prefix != new.url_prefix
                || old.assets_mapping_json != new.assets_mapping_json
                || old.image_exts != new.image_exts
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, requires: &[&str]) -> AssetEntry {
        AssetEntry {
            name: name.to_string(),
            requires: requires.iter().map(|s| s.to_string()).collect(),
            ..AssetEntry::default()
        }
    }

    fn config(entries: Vec<AssetEntry>) -> ProjectConfig {
        ProjectConfig::new_unchecked(
            PackageConfig {
                name: "app".to_string(),
                ..PackageConfig::default()
            },
            Some(AssetsConfig {
                entries,
                ..AssetsConfig::default()
            }),
            None,
        )
    }

    #[test]
    fn modified_and_added_entries_are_changed_removed_is_not() {
        let old = config(vec![entry("A", &[]), entry("B", &[])]);
        let new = config(vec![entry("A", &["jquery"]), entry("C", &[])]);

        let diff = ConfigDiff::between(&old, &new);

        assert_eq!(diff.changed_entries, vec!["A", "C"]);
        assert_eq!(diff.removed_entries, vec!["B"]);
        assert!(!diff.package_changed);
        assert!(!diff.assets_settings_changed);
    }

    #[test]
    fn entry_changes_schedule_per_entry_rebuilds_and_mapping() {
        let old = config(vec![entry("A", &[])]);
        let new = config(vec![entry("A", &["jquery"])]);

        let tasks = ConfigDiff::between(&old, &new).tasks();

        assert_eq!(
            tasks,
            vec![
                Task::new(TaskKind::BuildImages, "A"),
                Task::new(TaskKind::BuildStyles, "A"),
                Task::new(TaskKind::BuildJavaScripts, "A"),
                Task::all(TaskKind::RegenerateAssetsMapping),
                Task::restart(),
            ]
        );
    }

    #[test]
    fn url_prefix_change_rebuilds_every_category() {
        let old = config(vec![entry("A", &[])]);
        let mut new = old.clone();
        if let Some(assets) = new.assets.as_mut() {
            assets.url_prefix = "/static".to_string();
        }

        let diff = ConfigDiff::between(&old, &new);
        assert!(diff.assets_settings_changed);
        assert!(diff.changed_entries.is_empty());
        assert!(diff.tasks().contains(&Task::all(TaskKind::BuildStyles)));
    }

    #[test]
    fn graceful_flag_change_rebuilds_binary() {
        let old = config(vec![]);
        let mut new = old.clone();
        new.package.graceful = true;

        let diff = ConfigDiff::between(&old, &new);
        assert!(diff.package_changed);
        assert_eq!(
            diff.tasks(),
            vec![Task::all(TaskKind::BuildBinary), Task::restart()]
        );
    }

    #[test]
    fn identical_configs_produce_no_tasks() {
        let old = config(vec![entry("A", &["jquery"])]);
        let diff = ConfigDiff::between(&old, &old.clone());
        assert!(diff.is_empty());
        assert!(diff.tasks().is_empty());
    }

    #[test]
    fn dependency_changes_are_flagged_per_ecosystem() {
        let old = config(vec![]);
        let mut new = old.clone();
        new.package.dependencies.push("github.com/example/router".to_string());

        let diff = ConfigDiff::between(&old, &new);
        assert!(diff.package_deps_changed);
        assert!(!diff.assets_deps_changed);
        assert!(!diff.package_changed);
    }
}
