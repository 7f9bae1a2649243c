// src/assets/incremental.rs

//! Skip-if-unchanged support for stylesheet and script entries.
//!
//! Before running a tool for an entry, the driver hashes everything the
//! output depends on (the entry source, the entry's own source directory,
//! its declared `deps` directories, and the build mode). If the hash matches
//! the one stored for the entry's output in `.buildweb/sources.json` and the
//! fingerprinted output still exists, the tool is not run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::Result;

use super::fingerprint::{compute_file_hash, find_fingerprinted};
use super::{STATE_DIR, slash_path};

/// Relative path (from the project root) of the source fingerprint ledger.
pub const LEDGER_PATH: &str = "sources.json";

/// Incremental hash over the inputs of one entry.
#[derive(Debug, Clone)]
pub struct SourceFingerprint {
    hasher: Hasher,
}

impl SourceFingerprint {
    pub fn new(production: bool) -> Self {
        let mut hasher = Hasher::new();
        let mode: &[u8] = if production { b"production\0" } else { b"development\0" };
        hasher.update(mode);
        Self { hasher }
    }

    /// Add one file; a missing file contributes nothing.
    pub fn file(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Ok(());
        }
        let hash = compute_file_hash(path)?;
        self.hasher.update(slash_path(path).as_bytes());
        self.hasher.update(b"\0");
        self.hasher.update(hash.as_bytes());
        Ok(())
    }

    /// Add every file under `dir`, in sorted path order.
    pub fn tree(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                self.file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Add a named value that affects the output, e.g. tool flags.
    pub fn value(&mut self, label: &str, value: &str) {
        self.hasher.update(label.as_bytes());
        self.hasher.update(b"=");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\0");
    }

    pub fn finish(self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

/// Persisted logical output -> source fingerprint records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLedger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SourceLedger {
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(STATE_DIR).join(LEDGER_PATH)
    }

    /// Load the ledger for the project at `root`. A missing or unreadable
    /// ledger starts empty.
    pub fn load(root: &Path) -> Self {
        let path = Self::path_for(root);
        let entries = fs::read(&path)
            .ok()
            .and_then(|data| serde_json::from_slice(&data).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn get(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    pub fn record(&mut self, logical: impl Into<String>, fingerprint: impl Into<String>) {
        self.entries.insert(logical.into(), fingerprint.into());
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).with_context(|| format!("writing {:?}", self.path))?;
        Ok(())
    }

    /// Whether `logical` in `output_dir` was built from inputs hashing to
    /// `fingerprint` and is still there.
    pub fn is_up_to_date(&self, output_dir: &Path, key: &str, logical: &str, fingerprint: &str) -> bool {
        let up_to_date =
            self.get(key) == Some(fingerprint) && find_fingerprinted(output_dir, logical).is_some();
        debug!(output = %key, up_to_date, "checked source fingerprint");
        up_to_date
    }
}
