#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use buildweb_test_utils::{init_tracing, with_timeout};

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Write a solid-colour PNG of the given size to `root/rel`.
pub fn write_png(root: &Path, rel: &str, width: u32, height: u32, rgba: [u8; 4]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(&path)
        .unwrap();
    path
}

/// Sorted file names directly inside `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
