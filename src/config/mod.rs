// src/config/mod.rs

pub mod diff;
pub mod loader;
pub mod model;
pub mod snapshot;
pub mod validate;

pub use diff::ConfigDiff;
pub use loader::{load_and_validate, load_from_path, parse_str, project_root_dir};
pub use model::{
    AssetEntry, AssetsConfig, DistributionConfig, PackageConfig, ProjectConfig, RawProjectConfig,
};
pub use snapshot::ConfigStore;
