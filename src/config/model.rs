// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level project file as read from `project.toml`.
///
/// ```toml
/// [package]
/// name = "webapp"
/// version = "0.1.0"
/// deps = ["github.com/example/router"]
/// build_opts = ["-tags", "dev"]
/// omit_tests = ["models"]
///
/// [assets]
/// url_prefix = "/static"
/// image_exts = [".png", ".jpg"]
/// deps = ["stylus", "nib", "browserify"]
///
/// [[assets.vendor_set]]
/// name = "vendor"
/// requires = ["react"]
///
/// [[assets.entry]]
/// name = "home"
/// externals = ["vendor"]
/// ```
///
/// This is the unvalidated shape; use [`ProjectConfig`] everywhere else.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProjectConfig {
    #[serde(default)]
    pub package: Option<PackageConfig>,

    #[serde(default)]
    pub assets: Option<AssetsConfig>,

    #[serde(default)]
    pub distribution: Option<DistributionConfig>,
}

/// Validated project configuration.
///
/// Instances are immutable once built; a hot reload produces a brand new
/// value that replaces the old snapshot wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub package: PackageConfig,
    pub assets: Option<AssetsConfig>,
    pub distribution: Option<DistributionConfig>,
}

/// `[package]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct PackageConfig {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub authors: Vec<String>,

    /// Compiled-language dependencies installed before the first build.
    #[serde(default, rename = "deps")]
    pub dependencies: Vec<String>,

    /// Extra flags passed to the compiler.
    #[serde(default)]
    pub build_opts: Vec<String>,

    /// Module directories whose tests are never run on change.
    #[serde(default)]
    pub omit_tests: Vec<String>,

    /// A graceful application is trusted to exit on its own after an
    /// interrupt and is never force-killed.
    #[serde(default)]
    pub graceful: bool,

    /// Arguments always passed to the application binary.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides for the application process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[assets]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AssetsConfig {
    #[serde(default)]
    pub url_prefix: String,

    /// Where the logical -> fingerprinted JSON mapping is written, relative to
    /// the project root.
    #[serde(default = "default_assets_mapping_json")]
    pub assets_mapping_json: String,

    #[serde(default)]
    pub image_exts: Vec<String>,

    /// Package-installer dependencies (e.g. npm modules) for the asset tools.
    #[serde(default, rename = "deps")]
    pub dependencies: Vec<String>,

    #[serde(default, rename = "vendor_set")]
    pub vendor_sets: Vec<AssetEntry>,

    #[serde(default, rename = "entry")]
    pub entries: Vec<AssetEntry>,
}

/// A named, independently buildable bundle of assets.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct AssetEntry {
    pub name: String,

    #[serde(default)]
    pub requires: Vec<String>,

    /// Names of other entries whose `requires` are treated as external
    /// modules when bundling this one.
    #[serde(default)]
    pub externals: Vec<String>,

    /// Sibling source directories whose changes rebuild this entry.
    #[serde(default, rename = "deps")]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub bundle_opts: Vec<String>,
}

/// `[distribution]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct DistributionConfig {
    #[serde(default)]
    pub build_opts: Vec<String>,

    /// `[os, arch]` pairs, e.g. `[["linux", "amd64"], ["darwin", "arm64"]]`.
    #[serde(default)]
    pub cross_targets: Vec<Vec<String>>,
}

pub(crate) fn default_assets_mapping_json() -> String {
    "assets_map.json".to_string()
}

pub(crate) fn default_image_exts() -> Vec<String> {
    [".png", ".jpg", ".jpeg", ".gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ProjectConfig {
    /// Build without validation. Used by [`TryFrom<RawProjectConfig>`] after
    /// the checks in `validate.rs` have passed, and by test builders.
    pub fn new_unchecked(
        package: PackageConfig,
        assets: Option<AssetsConfig>,
        distribution: Option<DistributionConfig>,
    ) -> Self {
        Self {
            package,
            assets,
            distribution,
        }
    }

    /// All asset entries: vendor sets first, then page entries.
    pub fn asset_entries(&self) -> impl Iterator<Item = &AssetEntry> {
        self.assets
            .iter()
            .flat_map(|a| a.vendor_sets.iter().chain(a.entries.iter()))
    }

    /// Look up a vendor set or entry by name.
    pub fn asset_entry(&self, name: &str) -> Option<&AssetEntry> {
        self.asset_entries().find(|e| e.name == name)
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.asset_entries().map(|e| e.name.clone()).collect()
    }

    pub fn url_prefix(&self) -> &str {
        self.assets.as_ref().map(|a| a.url_prefix.as_str()).unwrap_or("")
    }

    pub fn assets_mapping_json(&self) -> String {
        self.assets
            .as_ref()
            .map(|a| a.assets_mapping_json.trim())
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_assets_mapping_json)
    }

    pub fn image_exts(&self) -> Vec<String> {
        match &self.assets {
            Some(a) if !a.image_exts.is_empty() => a.image_exts.clone(),
            _ => default_image_exts(),
        }
    }

    pub fn asset_dependencies(&self) -> &[String] {
        self.assets
            .as_ref()
            .map(|a| a.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Whether tests in `module` are excluded by `omit_tests`.
    pub fn omits_tests(&self, module: &str) -> bool {
        let module = module.trim_end_matches('/');
        self.package
            .omit_tests
            .iter()
            .any(|m| m.trim_end_matches('/') == module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> AssetEntry {
        AssetEntry {
            name: name.to_string(),
            ..AssetEntry::default()
        }
    }

    #[test]
    fn vendor_sets_come_before_entries() {
        let cfg = ProjectConfig::new_unchecked(
            PackageConfig::default(),
            Some(AssetsConfig {
                vendor_sets: vec![entry("vendor")],
                entries: vec![entry("home"), entry("admin")],
                ..AssetsConfig::default()
            }),
            None,
        );
        assert_eq!(cfg.entry_names(), vec!["vendor", "home", "admin"]);
        assert!(cfg.asset_entry("admin").is_some());
        assert!(cfg.asset_entry("missing").is_none());
    }

    #[test]
    fn defaults_apply_without_assets_section() {
        let cfg = ProjectConfig::new_unchecked(PackageConfig::default(), None, None);
        assert_eq!(cfg.url_prefix(), "");
        assert_eq!(cfg.assets_mapping_json(), "assets_map.json");
        assert_eq!(cfg.image_exts(), default_image_exts());
        assert!(cfg.entry_names().is_empty());
    }

    #[test]
    fn omit_tests_ignores_trailing_slash() {
        let cfg = ProjectConfig::new_unchecked(
            PackageConfig {
                omit_tests: vec!["models/".to_string()],
                ..PackageConfig::default()
            },
            None,
            None,
        );
        assert!(cfg.omits_tests("models"));
        assert!(!cfg.omits_tests("handlers"));
    }
}
