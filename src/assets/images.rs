// src/assets/images.rs

//! Image driver: copy an entry's images and pack its sprite folders.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::errors::{BuildwebError, Result};

use super::fingerprint::add_fingerprint;
use super::sprite::{build_sprite, entry_image_dir, find_sprite_sets};
use super::{AssetContext, AssetKind, reset_dir};

/// Files directly inside `dir` whose extension is one of `exts`
/// (case-insensitive, with leading dot), sorted by path.
pub fn list_images(dir: &Path, exts: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for item in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let item = item?;
        if !item.file_type()?.is_file() {
            continue;
        }
        let path = item.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = format!(".{}", ext.to_lowercase());
        if exts.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Rebuild `public/images/<entry>/` from `assets/images/<entry>/`.
pub async fn build(ctx: &AssetContext, config: &ProjectConfig, entry: &str) -> Result<()> {
    let source = entry_image_dir(&ctx.root, entry);
    if !source.is_dir() {
        return Err(BuildwebError::EntryNotFound(entry.to_string()));
    }

    let root = ctx.root.clone();
    let output = ctx.output_dir(AssetKind::Images).join(entry);
    let entry = entry.to_string();
    let exts = config.image_exts();
    let url_prefix = config.url_prefix().to_string();

    tokio::task::spawn_blocking(move || build_blocking(&root, &source, &output, &entry, &exts, &url_prefix))
        .await
        .map_err(|err| BuildwebError::Other(anyhow!("image build task panicked: {err}")))?
}

fn build_blocking(
    root: &Path,
    source: &Path,
    output: &Path,
    entry: &str,
    exts: &[String],
    url_prefix: &str,
) -> Result<()> {
    reset_dir(output)?;

    let images = list_images(source, exts)?;
    for path in images.iter() {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        fs::copy(path, output.join(name))
            .with_context(|| format!("copying {:?} into {:?}", path, output))?;
        let saved = add_fingerprint(output, name)?;
        info!(entry = %entry, path = %saved.display(), "saved image");
    }

    let sets = find_sprite_sets(entry, source)?;
    for set in sets.iter() {
        build_sprite(root, set, exts, url_prefix).map_err(|err| {
            BuildwebError::Other(anyhow!("sprite {} of entry {entry}: {err}", set.name))
        })?;
    }

    debug!(entry = %entry, images = images.len(), sprites = sets.len(), "image entry built");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configured_extensions_one_level_deep() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.PNG"), "png").unwrap();
        fs::write(dir.path().join("a.jpg"), "jpg").unwrap();
        fs::write(dir.path().join("notes.txt"), "txt").unwrap();
        fs::create_dir_all(dir.path().join("sprites")).unwrap();
        fs::write(dir.path().join("sprites/c.png"), "png").unwrap();

        let found = list_images(dir.path(), &[".png".to_string(), ".jpg".to_string()]).unwrap();

        assert_eq!(
            found,
            vec![dir.path().join("a.jpg"), dir.path().join("b.PNG")]
        );
    }
}
