// src/assets/mapping.rs

//! Logical path -> fingerprinted URL mapping.
//!
//! The mapping is rebuilt from what is on disk under `public/`, so it always
//! matches the artifacts that survived the last builds:
//!
//! ```json
//! {
//!   "/images/home/logo.png": "/static/images/home/fp3b1f...-logo.png",
//!   "/stylesheets/home.css": "/static/stylesheets/fp98c2...-home.css"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use regex::{Captures, Regex};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::errors::Result;

use super::fingerprint::parse_fingerprinted;
use super::{AssetKind, OUTPUT_ROOT, slash_path};

/// Keys are sorted so the written file is stable across runs.
pub type AssetsMapping = BTreeMap<String, String>;

/// Name of the environment variable that points the stylesheet plugin at the
/// mapping file.
pub const MAPPING_ENV_VAR: &str = "BUILDWEB_ASSETS_MAP";

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap_or_else(|_| unreachable!())
});

pub fn mapping_path(root: &Path, config: &ProjectConfig) -> PathBuf {
    root.join(config.assets_mapping_json())
}

/// Index every fingerprinted file under `<root>/public/{images,stylesheets,javascripts}`.
pub fn scan(root: &Path, url_prefix: &str) -> Result<AssetsMapping> {
    let public = root.join(OUTPUT_ROOT);
    let prefix = url_prefix.trim_end_matches('/');
    let mut mapping = AssetsMapping::new();

    for kind in AssetKind::ALL {
        let dir = public.join(kind.dir_name());
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some((_, logical)) = parse_fingerprinted(name) else {
                continue;
            };
            let Some(parent) = entry.path().parent().and_then(|p| p.strip_prefix(&public).ok()) else {
                continue;
            };
            let parent = slash_path(parent);
            mapping.insert(
                format!("/{parent}/{logical}"),
                format!("{prefix}/{parent}/{name}"),
            );
        }
    }

    Ok(mapping)
}

/// Only the `/images/...` part of [`scan`].
///
/// Images are built in an earlier stage than stylesheets, so this is current
/// while stylesheets build even though the mapping file is not yet.
pub fn scan_images(root: &Path, url_prefix: &str) -> Result<AssetsMapping> {
    let mut mapping = scan(root, url_prefix)?;
    mapping.retain(|logical, _| logical.starts_with("/images/"));
    Ok(mapping)
}

pub fn save(path: &Path, mapping: &AssetsMapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let mut json = serde_json::to_string_pretty(mapping)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("writing assets mapping {:?}", path))?;
    Ok(())
}

/// Rescan `public/` and rewrite the configured mapping file.
pub fn regenerate(root: &Path, config: &ProjectConfig) -> Result<AssetsMapping> {
    let mapping = scan(root, config.url_prefix())?;
    let path = mapping_path(root, config);
    save(&path, &mapping)?;
    info!(path = %path.display(), assets = mapping.len(), "saved assets mapping");
    Ok(mapping)
}

/// Replace `url(...)` references to known assets with their fingerprinted
/// URLs. References are matched as `/images/...`, `images/...` or
/// `../images/...`; anything not in the mapping is left untouched.
pub fn rewrite_css_urls(css: &str, mapping: &AssetsMapping) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures<'_>| {
            let reference = &caps[1];
            let key = format!("/{}", reference.trim_start_matches("../").trim_start_matches('/'));
            match mapping.get(&key) {
                Some(url) => {
                    debug!(from = %reference, to = %url, "rewrote asset url");
                    format!("url(\"{url}\")")
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_indexes_fingerprinted_files_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("public/images/home");
        let styles = dir.path().join("public/stylesheets");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&styles).unwrap();
        fs::write(images.join("fpabc123-logo.png"), "png").unwrap();
        fs::write(images.join("unfingerprinted.png"), "png").unwrap();
        fs::write(styles.join("fpdef456-home.css"), "css").unwrap();

        let mapping = scan(dir.path(), "/static/").unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.get("/images/home/logo.png").map(String::as_str),
            Some("/static/images/home/fpabc123-logo.png")
        );
        assert_eq!(
            mapping.get("/stylesheets/home.css").map(String::as_str),
            Some("/static/stylesheets/fpdef456-home.css")
        );
    }

    #[test]
    fn image_scan_leaves_out_other_categories() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("public/images/home");
        let scripts = dir.path().join("public/javascripts");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&scripts).unwrap();
        fs::write(images.join("fp0a1b-logo.png"), "png").unwrap();
        fs::write(scripts.join("fp2c3d-home.js"), "js").unwrap();

        let mapping = scan_images(dir.path(), "").unwrap();

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["/images/home/logo.png"], "/images/home/fp0a1b-logo.png");
    }

    #[test]
    fn saved_mapping_has_sorted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config/assets_map.json");
        let mut mapping = AssetsMapping::new();
        mapping.insert("/stylesheets/b.css".into(), "/stylesheets/fp2-b.css".into());
        mapping.insert("/images/a.png".into(), "/images/fp1-a.png".into());

        save(&path, &mapping).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let images = written.find("/images/a.png").unwrap();
        let styles = written.find("/stylesheets/b.css").unwrap();
        assert!(images < styles);
        let parsed: AssetsMapping = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn css_urls_are_rewritten_when_known() {
        let mut mapping = AssetsMapping::new();
        mapping.insert(
            "/images/home/logo.png".into(),
            "/static/images/home/fpabc-logo.png".into(),
        );

        let css = "a{background:url('../images/home/logo.png')}\nb{background:url(/images/other.png)}";
        let rewritten = rewrite_css_urls(css, &mapping);

        assert_eq!(
            rewritten,
            "a{background:url(\"/static/images/home/fpabc-logo.png\")}\nb{background:url(/images/other.png)}"
        );
    }
}
