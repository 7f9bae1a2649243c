// src/assets/fingerprint.rs

//! Content-addressed output names.
//!
//! A built artifact `dir/<logical>` is renamed to `dir/fp<hash>-<logical>`,
//! where `<hash>` is the BLAKE3 hex digest of its bytes. Before the rename,
//! every other `fp*-<logical>` file in `dir` is removed, so at most one
//! fingerprinted copy of a logical artifact exists per directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, warn};

pub const FINGERPRINT_PREFIX: &str = "fp";

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn fingerprinted_name(hash: &str, logical: &str) -> String {
    format!("{FINGERPRINT_PREFIX}{hash}-{logical}")
}

/// Split `fp<hash>-<logical>` into `(hash, logical)`.
pub fn parse_fingerprinted(file_name: &str) -> Option<(&str, &str)> {
    let rest = file_name.strip_prefix(FINGERPRINT_PREFIX)?;
    let (hash, logical) = rest.split_once('-')?;
    if hash.is_empty() || logical.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((hash, logical))
}

/// Fingerprint the freshly written `dir/<logical>`.
///
/// Returns the new path. If the file cannot be read the logical path is
/// returned unchanged and the artifact stays unfingerprinted.
pub fn add_fingerprint(dir: &Path, logical: &str) -> Result<PathBuf> {
    let source = dir.join(logical);
    let hash = match compute_file_hash(&source) {
        Ok(hash) => hash,
        Err(err) => {
            warn!(path = %source.display(), error = %err, "cannot fingerprint artifact; keeping logical name");
            return Ok(source);
        }
    };

    let target = dir.join(fingerprinted_name(&hash, logical));
    remove_stale(dir, logical, &hash)?;
    fs::rename(&source, &target)
        .with_context(|| format!("renaming {:?} to {:?}", source, target))?;

    debug!(path = %target.display(), "fingerprinted artifact");
    Ok(target)
}

/// Remove every `fp*-<logical>` file directly in `dir` whose hash differs
/// from `keep_hash`. Returns how many files were removed.
pub fn remove_stale(dir: &Path, logical: &str, keep_hash: &str) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some((hash, existing)) = parse_fingerprinted(name) {
            if existing == logical && hash != keep_hash {
                fs::remove_file(entry.path())
                    .with_context(|| format!("removing stale artifact {:?}", entry.path()))?;
                debug!(file = %name, "removed stale fingerprinted artifact");
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// The current fingerprinted copy of `logical` in `dir`, if any.
pub fn find_fingerprinted(dir: &Path, logical: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(parse_fingerprinted)
                .is_some_and(|(_, existing)| existing == logical)
        })
        .map(|entry| entry.path())
}
