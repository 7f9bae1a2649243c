// src/assets/styles.rs

//! Stylesheet driver.
//!
//! `assets/stylesheets/<entry>.styl` is compiled with stylus (with nib and
//! the asset-url plugin); otherwise `assets/stylesheets/<entry>.css` is
//! copied with its `url(...)` references rewritten. Either way the result is
//! fingerprinted into `public/stylesheets/`.
//!
//! Image URLs come from the fingerprinted files currently in
//! `public/images/`, never from the mapping file: the mapping is regenerated
//! after stylesheets in every batch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::errors::{BuildwebError, Result};

use super::fingerprint::add_fingerprint;
use super::incremental::{SourceFingerprint, SourceLedger};
use super::mapping::{self, AssetsMapping, MAPPING_ENV_VAR, rewrite_css_urls};
use super::sprite::SPRITE_STYLUS_DIR;
use super::{AssetContext, AssetKind, OUTPUT_ROOT, SOURCE_ROOT, STATE_DIR};

const STYLUS_PLUGIN_SOURCE: &str = include_str!("../../resources/stylus-assets.js");
const STYLUS_PLUGIN_FILE: &str = "stylus-assets.js";
/// Image URLs handed to the stylus plugin, inside the state directory.
pub const IMAGE_URLS_FILE: &str = "image_urls.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    Stylus(PathBuf),
    Css(PathBuf),
}

impl StyleSource {
    pub fn path(&self) -> &Path {
        match self {
            StyleSource::Stylus(p) | StyleSource::Css(p) => p,
        }
    }
}

/// The preprocessor source wins over plain CSS.
pub fn find_source(ctx: &AssetContext, entry: &str) -> Option<StyleSource> {
    let dir = ctx.source_dir(AssetKind::Stylesheets);
    let stylus = dir.join(format!("{entry}.styl"));
    if stylus.is_file() {
        return Some(StyleSource::Stylus(stylus));
    }
    let css = dir.join(format!("{entry}.css"));
    if css.is_file() {
        return Some(StyleSource::Css(css));
    }
    None
}

/// Stylus command line, with paths relative to the project root.
pub fn stylus_args(entry: &str, production: bool, plugin: &str) -> Vec<String> {
    let mut args = vec![
        "--use".to_string(),
        "nib".to_string(),
        format!("{SOURCE_ROOT}/stylesheets/{entry}.styl"),
        "--out".to_string(),
        format!("{OUTPUT_ROOT}/stylesheets"),
    ];
    if production {
        args.push("--compress".to_string());
    } else {
        args.push("--sourcemap-inline".to_string());
    }
    args.push("--use".to_string());
    args.push(plugin.to_string());
    args
}

pub async fn build(ctx: &AssetContext, config: &ProjectConfig, entry: &str) -> Result<()> {
    let source = find_source(ctx, entry).ok_or_else(|| BuildwebError::EntryNotFound(entry.to_string()))?;

    let out_dir = ctx.output_dir(AssetKind::Stylesheets);
    fs::create_dir_all(&out_dir).with_context(|| format!("cannot create {:?}", out_dir))?;
    let logical = format!("{entry}.css");
    let ledger_key = format!("stylesheets/{logical}");
    let image_urls = mapping::scan_images(&ctx.root, config.url_prefix())?;

    let fingerprint = source_fingerprint(ctx, config, entry, &source, &image_urls)?;
    let mut ledger = SourceLedger::load(&ctx.root);
    if ledger.is_up_to_date(&out_dir, &ledger_key, &logical, &fingerprint) {
        info!(entry = %entry, "stylesheet sources unchanged; keeping previous output");
        return Ok(());
    }

    match &source {
        StyleSource::Stylus(path) => {
            let plugin = install_stylus_plugin(&ctx.root)?;
            let urls_path = ctx.state_dir().join(IMAGE_URLS_FILE);
            mapping::save(&urls_path, &image_urls)?;
            debug!(entry = %entry, source = %path.display(), "compiling stylus");
            ctx.node_tool("stylus", &ctx.toolchain.stylus)
                .args(stylus_args(entry, ctx.production, &plugin.to_string_lossy()))
                .env(MAPPING_ENV_VAR, urls_path.to_string_lossy())
                .run()
                .await?;
        }
        StyleSource::Css(path) => {
            debug!(entry = %entry, source = %path.display(), "copying css");
            let css = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
            let target = out_dir.join(&logical);
            fs::write(&target, rewrite_css_urls(&css, &image_urls))
                .with_context(|| format!("writing {:?}", target))?;
        }
    }

    let saved = add_fingerprint(&out_dir, &logical)?;
    ledger.record(ledger_key, fingerprint);
    ledger.save()?;
    info!(entry = %entry, path = %saved.display(), "saved stylesheet");
    Ok(())
}

fn source_fingerprint(
    ctx: &AssetContext,
    config: &ProjectConfig,
    entry: &str,
    source: &StyleSource,
    image_urls: &AssetsMapping,
) -> Result<String> {
    let source_dir = ctx.source_dir(AssetKind::Stylesheets);
    let mut fp = SourceFingerprint::new(ctx.production);
    fp.file(source.path())?;
    fp.tree(&source_dir.join(entry))?;
    fp.tree(&ctx.root.join(SPRITE_STYLUS_DIR))?;
    if let Some(asset_entry) = config.asset_entry(entry) {
        for dep in asset_entry.dependencies.iter() {
            fp.tree(&source_dir.join(dep))?;
            fp.file(&source_dir.join(format!("{dep}.styl")))?;
            fp.file(&source_dir.join(format!("{dep}.css")))?;
        }
    }
    for (logical, url) in image_urls.iter() {
        fp.value(logical, url);
    }
    Ok(fp.finish())
}

/// Write the embedded stylus plugin into the state directory (if it is not
/// already there) and return its path.
fn install_stylus_plugin(root: &Path) -> Result<PathBuf> {
    let dir = root.join(STATE_DIR);
    let path = dir.join(STYLUS_PLUGIN_FILE);
    let current = fs::read_to_string(&path).ok();
    if current.as_deref() != Some(STYLUS_PLUGIN_SOURCE) {
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {:?}", dir))?;
        fs::write(&path, STYLUS_PLUGIN_SOURCE).with_context(|| format!("writing {:?}", path))?;
    }
    Ok(path)
}
