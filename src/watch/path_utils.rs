// src/watch/path_utils.rs

//! Path helpers shared by the watcher and the change classifier.

use std::path::Path;

/// Directories (relative to the project root) that are never watched:
/// version control, installed node modules, build output, and our own state.
pub const IGNORED_DIRS: [&str; 4] = [".git", "node_modules", "public", ".buildweb"];

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, since notify may report a
/// different absolute prefix for the same directory (symlinks, `/private/var`
/// on macOS). `None` if the path is outside the root.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Case-insensitive prefix match of `rel` against [`IGNORED_DIRS`].
pub fn is_ignored(rel: &str) -> bool {
    let rel = rel.trim_start_matches("./").to_lowercase();
    IGNORED_DIRS.iter().any(|dir| {
        rel == *dir
            || rel
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// File name without its last extension: `home.styl` -> `home`.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_dirs_match_by_prefix_case_insensitively() {
        assert!(is_ignored(".git"));
        assert!(is_ignored(".git/objects/ab"));
        assert!(is_ignored("Node_Modules/stylus/bin/stylus"));
        assert!(is_ignored("public/stylesheets/fpab-home.css"));
        assert!(is_ignored("./.buildweb/sources.json"));
        assert!(!is_ignored("publications/index.go"));
        assert!(!is_ignored("assets/images/home/logo.png"));
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/srv/web");
        assert_eq!(
            relative_str(root, Path::new("/srv/web/assets/images/home/a.png")).as_deref(),
            Some("assets/images/home/a.png")
        );
        assert_eq!(relative_str(root, Path::new("/srv/web")).as_deref(), Some(""));
    }

    #[test]
    fn stems_drop_last_extension_only() {
        assert_eq!(file_stem("home.styl"), "home");
        assert_eq!(file_stem("home.min.js"), "home.min");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
