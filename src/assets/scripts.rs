// src/assets/scripts.rs

//! Script driver: bundle `assets/javascripts/<entry>.{js,coffee}` with
//! browserify into a fingerprinted `public/javascripts/` file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::{AssetEntry, ProjectConfig};
use crate::errors::{BuildwebError, Result};

use super::fingerprint::add_fingerprint;
use super::incremental::{SourceFingerprint, SourceLedger};
use super::{AssetContext, AssetKind, OUTPUT_ROOT, SOURCE_ROOT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    JavaScript(PathBuf),
    Coffee(PathBuf),
}

impl ScriptSource {
    pub fn path(&self) -> &Path {
        match self {
            ScriptSource::JavaScript(p) | ScriptSource::Coffee(p) => p,
        }
    }

    pub fn is_coffee(&self) -> bool {
        matches!(self, ScriptSource::Coffee(_))
    }
}

pub fn find_source(ctx: &AssetContext, entry: &str) -> Option<ScriptSource> {
    let dir = ctx.source_dir(AssetKind::JavaScripts);
    let js = dir.join(format!("{entry}.js"));
    if js.is_file() {
        return Some(ScriptSource::JavaScript(js));
    }
    let coffee = dir.join(format!("{entry}.coffee"));
    if coffee.is_file() {
        return Some(ScriptSource::Coffee(coffee));
    }
    None
}

/// Browserify command line for `entry`, with paths relative to the project
/// root.
///
/// `--require` exposes the entry's own modules; every `external` entry's
/// `requires` are passed as `--external` so they are loaded from that
/// entry's bundle instead of being bundled twice.
pub fn bundle_args(config: &ProjectConfig, entry: &AssetEntry, coffee: bool, production: bool) -> Vec<String> {
    let ext = if coffee { "coffee" } else { "js" };
    let mut args = vec![format!("{SOURCE_ROOT}/javascripts/{}.{ext}", entry.name)];

    for module in entry.requires.iter() {
        args.push("--require".to_string());
        args.push(module.clone());
    }
    for external in entry.externals.iter() {
        let Some(other) = config.asset_entry(external) else {
            continue;
        };
        for module in other.requires.iter() {
            args.push("--external".to_string());
            args.push(module.clone());
        }
    }
    args.extend(entry.bundle_opts.iter().cloned());

    args.push("--transform".to_string());
    args.push(if coffee { "coffeeify" } else { "babelify" }.to_string());
    args.push("--transform".to_string());
    args.push("envify".to_string());

    if production {
        args.push("-g".to_string());
        args.push("uglifyify".to_string());
    } else {
        args.push("--debug".to_string());
    }

    args.push("--outfile".to_string());
    args.push(format!("{OUTPUT_ROOT}/javascripts/{}.js", entry.name));
    args
}

pub async fn build(ctx: &AssetContext, config: &ProjectConfig, entry_name: &str) -> Result<()> {
    let Some(entry) = config.asset_entry(entry_name) else {
        warn!(entry = %entry_name, "script entry is not configured; skipping");
        return Ok(());
    };

    // A production NODE_ENV in the host environment forces a production bundle.
    let production = ctx.production
        || std::env::var("NODE_ENV").is_ok_and(|v| v == "production");
    let ctx = AssetContext {
        production,
        ..ctx.clone()
    };

    let source = find_source(&ctx, entry_name)
        .ok_or_else(|| BuildwebError::EntryNotFound(entry_name.to_string()))?;

    let out_dir = ctx.output_dir(AssetKind::JavaScripts);
    fs::create_dir_all(&out_dir).with_context(|| format!("cannot create {:?}", out_dir))?;
    let logical = format!("{entry_name}.js");
    let ledger_key = format!("javascripts/{logical}");
    let args = bundle_args(config, entry, source.is_coffee(), production);

    let source_dir = ctx.source_dir(AssetKind::JavaScripts);
    let mut fp = SourceFingerprint::new(production);
    fp.file(source.path())?;
    fp.tree(&source_dir.join(entry_name))?;
    for dep in entry.dependencies.iter() {
        fp.tree(&source_dir.join(dep))?;
        fp.file(&source_dir.join(format!("{dep}.js")))?;
        fp.file(&source_dir.join(format!("{dep}.coffee")))?;
    }
    fp.value("args", &args.join(" "));
    let fingerprint = fp.finish();

    let mut ledger = SourceLedger::load(&ctx.root);
    if ledger.is_up_to_date(&out_dir, &ledger_key, &logical, &fingerprint) {
        info!(entry = %entry_name, "script sources unchanged; keeping previous output");
        return Ok(());
    }

    debug!(entry = %entry_name, args = ?args, "bundling");
    ctx.node_tool("browserify", &ctx.toolchain.browserify)
        .args(&args)
        .run()
        .await?;

    let saved = add_fingerprint(&out_dir, &logical)?;
    ledger.record(ledger_key, fingerprint);
    ledger.save()?;
    info!(entry = %entry_name, path = %saved.display(), "saved script bundle");
    Ok(())
}
