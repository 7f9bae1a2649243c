// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{AssetsConfig, ProjectConfig, RawProjectConfig};
use crate::errors::{BuildwebError, Result};

impl TryFrom<RawProjectConfig> for ProjectConfig {
    type Error = crate::errors::BuildwebError;

    fn try_from(raw: RawProjectConfig) -> std::result::Result<Self, Self::Error> {
        let RawProjectConfig {
            package,
            assets,
            distribution,
        } = raw;

        let package = package.ok_or_else(|| {
            BuildwebError::ConfigError("project file must contain a [package] section".to_string())
        })?;
        if package.name.trim().is_empty() {
            return Err(BuildwebError::ConfigError(
                "[package].name must not be empty".to_string(),
            ));
        }

        let assets = match assets {
            Some(assets) => Some(normalize_assets(assets)?),
            None => None,
        };

        if let Some(dist) = &distribution {
            for target in dist.cross_targets.iter() {
                if target.len() != 2 {
                    return Err(BuildwebError::ConfigError(format!(
                        "[distribution].cross_targets entries must be [os, arch] pairs (got {:?})",
                        target
                    )));
                }
            }
        }

        Ok(ProjectConfig::new_unchecked(package, assets, distribution))
    }
}

fn normalize_assets(mut assets: AssetsConfig) -> Result<AssetsConfig> {
    validate_entry_names(&assets)?;
    validate_externals(&assets)?;

    assets.image_exts = assets
        .image_exts
        .into_iter()
        .map(|ext| {
            let ext = ext.trim().to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect();

    Ok(assets)
}

fn validate_entry_names(assets: &AssetsConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in assets.vendor_sets.iter().chain(assets.entries.iter()) {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(BuildwebError::ConfigError(
                "asset entries must have a non-empty name".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(BuildwebError::ConfigError(format!(
                "asset entry name '{}' must not contain path separators",
                name
            )));
        }
        if !seen.insert(name) {
            return Err(BuildwebError::ConfigError(format!(
                "duplicate asset entry name '{}'",
                name
            )));
        }
    }
    Ok(())
}

fn validate_externals(assets: &AssetsConfig) -> Result<()> {
    let names: HashSet<&str> = assets
        .vendor_sets
        .iter()
        .chain(assets.entries.iter())
        .map(|e| e.name.as_str())
        .collect();

    for entry in assets.vendor_sets.iter().chain(assets.entries.iter()) {
        for external in entry.externals.iter() {
            if external == &entry.name {
                return Err(BuildwebError::ConfigError(format!(
                    "asset entry '{}' cannot list itself in `externals`",
                    entry.name
                )));
            }
            if !names.contains(external.as_str()) {
                return Err(BuildwebError::ConfigError(format!(
                    "asset entry '{}' has unknown external '{}'",
                    entry.name, external
                )));
            }
        }
    }
    Ok(())
}
