// src/watch/classify.rs

//! Mapping raw filesystem paths to scheduler tasks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::trace;

use crate::assets::sprite::SPRITE_STYLUS_SUBDIR;
use crate::assets::{AssetKind, SOURCE_ROOT};
use crate::build::binary::module_has_tests;
use crate::config::ProjectConfig;
use crate::engine::{Task, TaskKind};
use crate::fs::FileSystem;

use super::path_utils::{file_stem, is_ignored, relative_str};

/// Editor swap, backup and temporary files.
pub const SWAP_FILE_PATTERNS: [&str; 10] = [
    "*.swp", "*.swx", "*.swo", "*.swpx", "*~", ".#*", "#*#", "*.tmp", "*.bak", "4913",
];

/// Extension of compiled-language sources.
pub const SOURCE_EXTENSION: &str = "go";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Nothing to do.
    Ignored,
    /// The project file changed; reload it.
    ConfigChanged,
    /// Rebuild work for the next debounce flush.
    Tasks(Vec<Task>),
}

pub struct ChangeClassifier {
    root: PathBuf,
    config_file: String,
    fs: Arc<dyn FileSystem>,
    swap_files: GlobSet,
}

impl fmt::Debug for ChangeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeClassifier")
            .field("root", &self.root)
            .field("config_file", &self.config_file)
            .finish_non_exhaustive()
    }
}

impl ChangeClassifier {
    /// `config_file` is the project file path relative to `root`.
    pub fn new(root: impl Into<PathBuf>, config_file: impl Into<String>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            config_file: config_file.into(),
            fs,
            swap_files: compile_globset(&SWAP_FILE_PATTERNS)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the project file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(&self.config_file)
    }

    pub fn is_swap_file(&self, rel: &str) -> bool {
        let name = rel.rsplit('/').next().unwrap_or(rel);
        self.swap_files.is_match(name)
    }

    pub fn classify(&self, path: &Path, config: &ProjectConfig) -> Classification {
        let Some(rel) = relative_str(&self.root, path) else {
            return Classification::Ignored;
        };
        let rel = rel.trim_start_matches("./");
        if rel.is_empty() || is_ignored(rel) || self.is_swap_file(rel) {
            trace!(path = %rel, "ignoring change");
            return Classification::Ignored;
        }

        if rel == self.config_file {
            return Classification::ConfigChanged;
        }

        let tasks = if let Some(asset_path) = rel.strip_prefix(&format!("{SOURCE_ROOT}/")) {
            classify_asset(asset_path, config)
        } else if Path::new(rel).extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            self.classify_source(rel, config)
        } else {
            Vec::new()
        };

        if tasks.is_empty() {
            Classification::Ignored
        } else {
            Classification::Tasks(tasks)
        }
    }

    fn classify_source(&self, rel: &str, config: &ProjectConfig) -> Vec<Task> {
        let module = match rel.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => ".",
        };

        let mut tasks = Vec::with_capacity(3);
        if !config.omits_tests(module) && module_has_tests(self.fs.as_ref(), &self.root, module) {
            tasks.push(Task::new(TaskKind::RunBinaryTests, module));
        }
        tasks.push(Task::new(TaskKind::BuildBinary, module));
        tasks.push(Task::restart());
        tasks
    }
}

/// `asset_path` is relative to `assets/`, e.g. `images/home/logo.png`.
fn classify_asset(asset_path: &str, config: &ProjectConfig) -> Vec<Task> {
    let mut segments = asset_path.split('/');
    let Some(kind) = segments.next().and_then(AssetKind::from_dir_name) else {
        return Vec::new();
    };
    let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    let name = match rest.as_slice() {
        [] => return Vec::new(),
        [file] => file_stem(file),
        [dir, file] if kind == AssetKind::Stylesheets && *dir == SPRITE_STYLUS_SUBDIR => {
            sprite_fragment_entry(file_stem(file), config).unwrap_or(*dir)
        }
        [dir, ..] => *dir,
    };

    let kind = kind.task_kind();
    let mut tasks = Vec::new();
    if config.asset_entry(name).is_some() {
        tasks.push(Task::new(kind, name));
    } else {
        // Shared sources: rebuild the entries that declare them, or the
        // whole category when nobody does.
        let dependents: Vec<&str> = config
            .asset_entries()
            .filter(|e| e.dependencies.iter().any(|d| d == name))
            .map(|e| e.name.as_str())
            .collect();
        if dependents.is_empty() {
            tasks.push(Task::all(kind));
        } else {
            tasks.extend(dependents.into_iter().map(|entry| Task::new(kind, entry)));
        }
    }
    tasks.push(Task::all(TaskKind::RegenerateAssetsMapping));
    tasks
}

/// Owner of a generated `sprites/<entry>_<set>.styl` fragment. The longest
/// matching entry name wins, since entry names may contain underscores.
fn sprite_fragment_entry<'a>(stem: &str, config: &'a ProjectConfig) -> Option<&'a str> {
    config
        .asset_entries()
        .map(|e| e.name.as_str())
        .filter(|name| {
            stem.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('_'))
        })
        .max_by_key(|name| name.len())
}

fn compile_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetEntry, AssetsConfig, PackageConfig};
    use crate::fs::mock::MockFileSystem;

    fn config() -> ProjectConfig {
        ProjectConfig::new_unchecked(
            PackageConfig {
                name: "webapp".to_string(),
                omit_tests: vec!["models".to_string()],
                ..PackageConfig::default()
            },
            Some(AssetsConfig {
                entries: vec![
                    AssetEntry {
                        name: "home".to_string(),
                        dependencies: vec!["widgets".to_string()],
                        ..AssetEntry::default()
                    },
                    AssetEntry {
                        name: "admin".to_string(),
                        ..AssetEntry::default()
                    },
                ],
                ..AssetsConfig::default()
            }),
            None,
        )
    }

    fn classifier(fs: MockFileSystem) -> ChangeClassifier {
        ChangeClassifier::new("/proj", "project.toml", Arc::new(fs)).unwrap()
    }

    fn classify(c: &ChangeClassifier, rel: &str) -> Classification {
        c.classify(&Path::new("/proj").join(rel), &config())
    }

    #[test]
    fn swap_files_and_ignored_dirs_are_dropped() {
        let c = classifier(MockFileSystem::new());
        for rel in [
            "handlers/.user.go.swp",
            "main.go~",
            "assets/stylesheets/.#home.styl",
            "4913",
            "node_modules/nib/index.js",
            "public/images/home/fpab-logo.png",
            ".git/HEAD",
            "README.md",
        ] {
            assert_eq!(classify(&c, rel), Classification::Ignored, "{rel}");
        }
    }

    #[test]
    fn project_file_triggers_reload() {
        let c = classifier(MockFileSystem::new());
        assert_eq!(classify(&c, "project.toml"), Classification::ConfigChanged);
    }

    #[test]
    fn source_change_with_tests_runs_them_first() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/handlers/user.go", "package handlers");
        fs.add_file("/proj/handlers/user_test.go", "package handlers");
        let c = classifier(fs);

        assert_eq!(
            classify(&c, "handlers/user.go"),
            Classification::Tasks(vec![
                Task::new(TaskKind::RunBinaryTests, "handlers"),
                Task::new(TaskKind::BuildBinary, "handlers"),
                Task::restart(),
            ])
        );
    }

    #[test]
    fn omitted_or_untested_modules_skip_tests() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/models/user.go", "package models");
        fs.add_file("/proj/models/user_test.go", "package models");
        fs.add_file("/proj/main.go", "package main");
        let c = classifier(fs);

        assert_eq!(
            classify(&c, "models/user.go"),
            Classification::Tasks(vec![Task::new(TaskKind::BuildBinary, "models"), Task::restart()])
        );
        assert_eq!(
            classify(&c, "main.go"),
            Classification::Tasks(vec![Task::new(TaskKind::BuildBinary, "."), Task::restart()])
        );
    }

    #[test]
    fn asset_changes_target_the_entry() {
        let c = classifier(MockFileSystem::new());

        assert_eq!(
            classify(&c, "assets/images/home/sprites@2x/arrow.png"),
            Classification::Tasks(vec![
                Task::new(TaskKind::BuildImages, "home"),
                Task::all(TaskKind::RegenerateAssetsMapping),
            ])
        );
        assert_eq!(
            classify(&c, "assets/stylesheets/admin.styl"),
            Classification::Tasks(vec![
                Task::new(TaskKind::BuildStyles, "admin"),
                Task::all(TaskKind::RegenerateAssetsMapping),
            ])
        );
    }

    #[test]
    fn shared_asset_changes_rebuild_dependents_or_category() {
        let c = classifier(MockFileSystem::new());

        assert_eq!(
            classify(&c, "assets/javascripts/widgets/menu.js"),
            Classification::Tasks(vec![
                Task::new(TaskKind::BuildJavaScripts, "home"),
                Task::all(TaskKind::RegenerateAssetsMapping),
            ])
        );
        assert_eq!(
            classify(&c, "assets/stylesheets/base/reset.styl"),
            Classification::Tasks(vec![
                Task::all(TaskKind::BuildStyles),
                Task::all(TaskKind::RegenerateAssetsMapping),
            ])
        );
    }

    #[test]
    fn generated_sprite_fragments_rebuild_their_entry() {
        let c = classifier(MockFileSystem::new());

        assert_eq!(
            classify(&c, "assets/stylesheets/sprites/home_sprites_2x.styl"),
            Classification::Tasks(vec![
                Task::new(TaskKind::BuildStyles, "home"),
                Task::all(TaskKind::RegenerateAssetsMapping),
            ])
        );
    }

    #[test]
    fn category_root_and_unknown_asset_dirs_are_ignored() {
        let c = classifier(MockFileSystem::new());
        assert_eq!(classify(&c, "assets/images"), Classification::Ignored);
        assert_eq!(classify(&c, "assets/fonts/a.woff"), Classification::Ignored);
    }
}
