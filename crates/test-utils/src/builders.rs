#![allow(dead_code)]

use buildweb::config::{
    AssetEntry, AssetsConfig, DistributionConfig, PackageConfig, ProjectConfig, RawProjectConfig,
};

/// Builder for `ProjectConfig` to simplify test setup.
///
/// `build()` goes through the same validation as a parsed project file.
pub struct ProjectConfigBuilder {
    config: RawProjectConfig,
}

impl ProjectConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            config: RawProjectConfig {
                package: Some(PackageConfig {
                    name: name.to_string(),
                    ..PackageConfig::default()
                }),
                assets: None,
                distribution: None,
            },
        }
    }

    fn package(&mut self) -> &mut PackageConfig {
        self.config.package.get_or_insert_with(PackageConfig::default)
    }

    fn assets(&mut self) -> &mut AssetsConfig {
        self.config.assets.get_or_insert_with(AssetsConfig::default)
    }

    pub fn package_dep(mut self, dep: &str) -> Self {
        self.package().dependencies.push(dep.to_string());
        self
    }

    pub fn build_opt(mut self, opt: &str) -> Self {
        self.package().build_opts.push(opt.to_string());
        self
    }

    pub fn omit_tests(mut self, module: &str) -> Self {
        self.package().omit_tests.push(module.to_string());
        self
    }

    pub fn graceful(mut self, val: bool) -> Self {
        self.package().graceful = val;
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.package().args.push(arg.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.package().env.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds an empty `[assets]` section if none exists yet.
    pub fn with_assets(mut self) -> Self {
        self.assets();
        self
    }

    pub fn url_prefix(mut self, prefix: &str) -> Self {
        self.assets().url_prefix = prefix.to_string();
        self
    }

    pub fn asset_dep(mut self, dep: &str) -> Self {
        self.assets().dependencies.push(dep.to_string());
        self
    }

    pub fn image_ext(mut self, ext: &str) -> Self {
        self.assets().image_exts.push(ext.to_string());
        self
    }

    pub fn vendor_set(mut self, entry: AssetEntry) -> Self {
        self.assets().vendor_sets.push(entry);
        self
    }

    pub fn entry(mut self, entry: AssetEntry) -> Self {
        self.assets().entries.push(entry);
        self
    }

    pub fn cross_target(mut self, os: &str, arch: &str) -> Self {
        self.config
            .distribution
            .get_or_insert_with(DistributionConfig::default)
            .cross_targets
            .push(vec![os.to_string(), arch.to_string()]);
        self
    }

    pub fn build(self) -> ProjectConfig {
        ProjectConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `AssetEntry`.
pub struct AssetEntryBuilder {
    entry: AssetEntry,
}

impl AssetEntryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            entry: AssetEntry {
                name: name.to_string(),
                ..AssetEntry::default()
            },
        }
    }

    pub fn requires(mut self, module: &str) -> Self {
        self.entry.requires.push(module.to_string());
        self
    }

    pub fn external(mut self, entry: &str) -> Self {
        self.entry.externals.push(entry.to_string());
        self
    }

    pub fn dep(mut self, dir: &str) -> Self {
        self.entry.dependencies.push(dir.to_string());
        self
    }

    pub fn bundle_opt(mut self, opt: &str) -> Self {
        self.entry.bundle_opts.push(opt.to_string());
        self
    }

    pub fn build(self) -> AssetEntry {
        self.entry
    }
}
