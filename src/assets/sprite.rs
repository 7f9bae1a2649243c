// src/assets/sprite.rs

//! Sprite atlases.
//!
//! Every `sprite*` folder directly inside `assets/images/<entry>/` becomes
//! one vertically stacked PNG under `public/images/<entry>/` plus a
//! generated stylus fragment in `assets/stylesheets/sprites/` that exposes
//! one position variable per image and a mixin that applies it.
//!
//! A `@2x` / `@3x` folder suffix marks a high-density set: offsets and sizes
//! in the fragment are divided by the ratio, so they are in CSS pixels.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{RgbaImage, imageops};
use tracing::{debug, info, warn};

use crate::errors::Result;

use super::fingerprint::add_fingerprint;
use super::images::list_images;
use super::{OUTPUT_ROOT, SOURCE_ROOT};

/// Folder name prefix that marks a sprite set.
pub const SPRITE_DIR_PREFIX: &str = "sprite";
/// Where generated stylus fragments go, relative to the project root.
pub const SPRITE_STYLUS_DIR: &str = "assets/stylesheets/sprites";
/// Last component of [`SPRITE_STYLUS_DIR`].
pub const SPRITE_STYLUS_SUBDIR: &str = "sprites";

/// One sprite folder of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSet {
    pub entry: String,
    /// Normalised name, e.g. `sprites_2x` for a `sprites@2x` folder.
    pub name: String,
    pub dir: PathBuf,
    pub pixel_ratio: u32,
}

impl SpriteSet {
    pub fn new(entry: impl Into<String>, folder_name: &str, dir: impl Into<PathBuf>) -> Self {
        let (name, pixel_ratio) = parse_set_name(folder_name);
        Self {
            entry: entry.into(),
            name,
            dir: dir.into(),
            pixel_ratio,
        }
    }
}

/// Split a folder name into normalised set name and pixel ratio.
///
/// `icons` -> (`icons`, 1), `icons@2x` -> (`icons_2x`, 2),
/// `icons@3x` -> (`icons_3x`, 3). Any other `@` suffix is treated as 1x.
pub fn parse_set_name(folder_name: &str) -> (String, u32) {
    match folder_name.rsplit_once('@') {
        Some((base, suffix)) => {
            let ratio = match suffix {
                "2x" => 2,
                "3x" => 3,
                _ => 1,
            };
            (format!("{base}_{ratio}x"), ratio)
        }
        None => (folder_name.to_string(), 1),
    }
}

/// Generated description of one image inside an atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    /// `<set>-<file stem>`
    pub name: String,
    pub x: i64,
    /// Negative cumulative height of the images above, in CSS pixels.
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Input to the layout: file stem and pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub stem: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteLayout {
    /// Canvas size in source pixels.
    pub width: u32,
    pub height: u32,
    /// Top edge of each image on the canvas, in source pixels.
    pub offsets: Vec<u32>,
    pub sprites: Vec<SpriteImage>,
    /// Stems of images whose size is not a multiple of the pixel ratio.
    pub uneven: Vec<String>,
}

/// Stack `images` top to bottom in input order.
pub fn layout(set_name: &str, pixel_ratio: u32, images: &[SourceImage]) -> SpriteLayout {
    let ratio = pixel_ratio.max(1);
    let mut layout = SpriteLayout {
        width: 0,
        height: 0,
        offsets: Vec::with_capacity(images.len()),
        sprites: Vec::with_capacity(images.len()),
        uneven: Vec::new(),
    };

    let mut css_offset: i64 = 0;
    for image in images {
        layout.offsets.push(layout.height);
        layout.width = layout.width.max(image.width);
        layout.height += image.height;

        if image.width % ratio != 0 || image.height % ratio != 0 {
            layout.uneven.push(image.stem.clone());
        }
        let width = image.width / ratio;
        let height = image.height / ratio;
        layout.sprites.push(SpriteImage {
            name: format!("{set_name}-{}", image.stem),
            x: 0,
            y: -css_offset,
            width,
            height,
        });
        css_offset += i64::from(height);
    }

    layout
}

/// Stylus fragment for one atlas.
pub fn render_stylus(entry: &str, set_name: &str, atlas_url: &str, sprites: &[SpriteImage]) -> String {
    let mut out = String::new();
    for sprite in sprites {
        let _ = writeln!(
            out,
            "${entry}-{} = {}px {}px {}px {}px",
            sprite.name, sprite.x, sprite.y, sprite.width, sprite.height
        );
    }
    out.push('\n');
    let _ = writeln!(out, "{entry}-{set_name}($sprite)");
    let _ = writeln!(out, "  background-image url(\"{atlas_url}\")");
    out.push_str("  background-position $sprite[0] $sprite[1]\n");
    out.push_str("  width $sprite[2]\n");
    out.push_str("  height $sprite[3]\n");
    out
}

/// Sprite folders directly inside `entry_dir`, sorted by name.
pub fn find_sprite_sets(entry: &str, entry_dir: &Path) -> Result<Vec<SpriteSet>> {
    let mut sets = Vec::new();
    if !entry_dir.is_dir() {
        return Ok(sets);
    }
    for item in fs::read_dir(entry_dir).with_context(|| format!("reading dir {:?}", entry_dir))? {
        let item = item?;
        if !item.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = item.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with(SPRITE_DIR_PREFIX) {
            sets.push(SpriteSet::new(entry, &name, item.path()));
        }
    }
    sets.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(sets)
}

/// Build one atlas: decode, pack, write and fingerprint the PNG, then write
/// the stylus fragment. Returns the fingerprinted atlas path, or `None` if
/// the folder holds no images.
///
/// Blocking; the image driver runs it on the blocking pool.
pub fn build_sprite(
    root: &Path,
    set: &SpriteSet,
    image_exts: &[String],
    url_prefix: &str,
) -> Result<Option<PathBuf>> {
    let files = list_images(&set.dir, image_exts)?;
    if files.is_empty() {
        warn!(entry = %set.entry, sprite = %set.name, "sprite folder has no images; skipping");
        return Ok(None);
    }

    let mut decoded = Vec::with_capacity(files.len());
    let mut sources = Vec::with_capacity(files.len());
    for path in files.iter() {
        let img = image::open(path)
            .with_context(|| format!("cannot decode sprite image {:?}", path))?
            .to_rgba8();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        sources.push(SourceImage {
            stem,
            width: img.width(),
            height: img.height(),
        });
        decoded.push(img);
    }

    let layout = layout(&set.name, set.pixel_ratio, &sources);
    for stem in layout.uneven.iter() {
        warn!(
            entry = %set.entry,
            sprite = %set.name,
            image = %stem,
            pixel_ratio = set.pixel_ratio,
            "image size is not a multiple of the pixel ratio"
        );
    }

    let mut canvas = RgbaImage::new(layout.width, layout.height);
    for (img, top) in decoded.iter().zip(layout.offsets.iter()) {
        imageops::replace(&mut canvas, img, 0, i64::from(*top));
    }

    let out_dir = root.join(OUTPUT_ROOT).join("images").join(&set.entry);
    fs::create_dir_all(&out_dir).with_context(|| format!("cannot create {:?}", out_dir))?;
    let logical = format!("{}.png", set.name);
    canvas.save(out_dir.join(&logical))?;
    let atlas = add_fingerprint(&out_dir, &logical)?;
    info!(entry = %set.entry, path = %atlas.display(), "saved sprite image");

    let file_name = atlas
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(logical);
    let url = format!(
        "{}/images/{}/{}",
        url_prefix.trim_end_matches('/'),
        set.entry,
        file_name
    );

    let stylus_dir = root.join(SPRITE_STYLUS_DIR);
    fs::create_dir_all(&stylus_dir).with_context(|| format!("cannot create {:?}", stylus_dir))?;
    let stylus_path = stylus_dir.join(format!("{}_{}.styl", set.entry, set.name));
    let fragment = render_stylus(&set.entry, &set.name, &url, &layout.sprites);
    if write_if_changed(&stylus_path, &fragment)? {
        debug!(path = %stylus_path.display(), "wrote sprite stylus fragment");
    }

    Ok(Some(atlas))
}

/// Leave `path` untouched when it already holds `contents`, so the watcher
/// does not see a change. Returns whether the file was written.
fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    if fs::read_to_string(path).is_ok_and(|current| current == contents) {
        return Ok(false);
    }
    fs::write(path, contents).with_context(|| format!("cannot write {:?}", path))?;
    Ok(true)
}

/// Source directory of an entry's images.
pub(crate) fn entry_image_dir(root: &Path, entry: &str) -> PathBuf {
    root.join(SOURCE_ROOT).join("images").join(entry)
}
