// src/build/binary.rs

//! Compiling and testing the application with the go toolchain.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ProjectConfig;
use crate::errors::Result;
use crate::exec::{ToolCommand, Toolchain};
use crate::fs::FileSystem;

/// Output directory for cross-compiled distribution binaries.
pub const DIST_DIR: &str = "dist";
/// Suffix of compiled-language test files.
pub const TEST_FILE_SUFFIX: &str = "_test.go";

/// `[os, arch]` pair from `[distribution].cross_targets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTarget {
    pub os: String,
    pub arch: String,
}

impl CrossTarget {
    pub fn from_pair(pair: &[String]) -> Option<Self> {
        match pair {
            [os, arch] => Some(Self {
                os: os.clone(),
                arch: arch.clone(),
            }),
            _ => None,
        }
    }
}

/// `<root>/<package name>`, with `.exe` on Windows.
pub fn binary_path(root: &Path, config: &ProjectConfig) -> PathBuf {
    root.join(executable_name(&config.package.name, cfg!(windows)))
}

/// `<root>/dist/<name>-<os>-<arch>`, with `.exe` for windows targets.
pub fn dist_binary_path(root: &Path, config: &ProjectConfig, target: &CrossTarget) -> PathBuf {
    let name = format!("{}-{}-{}", config.package.name, target.os, target.arch);
    root.join(DIST_DIR)
        .join(executable_name(&name, target.os == "windows"))
}

fn executable_name(name: &str, windows: bool) -> String {
    if windows {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// `go build -o <output> <build_opts...> [<dist build_opts...>]`.
pub fn build_command(
    root: &Path,
    toolchain: &Toolchain,
    config: &ProjectConfig,
    output: &Path,
    target: Option<&CrossTarget>,
    dist: bool,
) -> ToolCommand {
    let mut cmd = ToolCommand::new("go build", Toolchain::resolve(root, &toolchain.go))
        .arg("build")
        .arg("-o")
        .arg(output)
        .args(&config.package.build_opts)
        .current_dir(root);
    if dist {
        if let Some(distribution) = &config.distribution {
            cmd = cmd.args(&distribution.build_opts);
        }
    }
    if let Some(target) = target {
        cmd = cmd.env("GOOS", &target.os).env("GOARCH", &target.arch);
    }
    cmd
}

/// Build the development binary and return its path.
pub async fn build(root: &Path, toolchain: &Toolchain, config: &ProjectConfig) -> Result<PathBuf> {
    let output = binary_path(root, config);
    build_command(root, toolchain, config, &output, None, false)
        .run()
        .await?;
    info!(binary = %output.display(), "built application binary");
    Ok(output)
}

/// Build one distribution binary: for the host when `target` is `None`,
/// otherwise cross-compiled into `dist/`.
pub async fn build_dist(
    root: &Path,
    toolchain: &Toolchain,
    config: &ProjectConfig,
    target: Option<&CrossTarget>,
) -> Result<PathBuf> {
    let output = match target {
        Some(target) => dist_binary_path(root, config, target),
        None => binary_path(root, config),
    };
    build_command(root, toolchain, config, &output, target, true)
        .run()
        .await?;
    info!(binary = %output.display(), "built distribution binary");
    Ok(output)
}

/// Go package pattern for a module directory relative to the root.
///
/// Empty means every package; `.` is the root package.
pub fn go_package(module: &str) -> String {
    let module = module.trim_end_matches('/');
    if module.is_empty() {
        "./...".to_string()
    } else if module == "." || module.starts_with("./") || module.starts_with('/') {
        module.to_string()
    } else {
        format!("./{module}")
    }
}

/// Whether the module directory (`.` for the root) holds any test file.
pub fn module_has_tests(fs: &dyn FileSystem, root: &Path, module: &str) -> bool {
    let dir = if module == "." { root.to_path_buf() } else { root.join(module) };
    match fs.read_dir(&dir) {
        Ok(entries) => entries.iter().any(|p| {
            fs.is_file(p)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(TEST_FILE_SUFFIX))
        }),
        Err(_) => false,
    }
}

pub fn test_command(root: &Path, toolchain: &Toolchain, module: &str) -> ToolCommand {
    ToolCommand::new("go test", Toolchain::resolve(root, &toolchain.go))
        .arg("test")
        .arg(go_package(module))
        .current_dir(root)
}

pub async fn run_tests(root: &Path, toolchain: &Toolchain, module: &str) -> Result<()> {
    test_command(root, toolchain, module).run().await?;
    info!(module = %go_package(module), "tests passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistributionConfig, PackageConfig};
    use crate::fs::mock::MockFileSystem;
    use std::ffi::OsString;

    fn config() -> ProjectConfig {
        ProjectConfig::new_unchecked(
            PackageConfig {
                name: "webapp".to_string(),
                build_opts: vec!["-tags".to_string(), "dev".to_string()],
                ..PackageConfig::default()
            },
            None,
            Some(DistributionConfig {
                build_opts: vec!["-ldflags=-s -w".to_string()],
                cross_targets: vec![vec!["linux".to_string(), "arm64".to_string()]],
            }),
        )
    }

    #[test]
    fn module_paths_become_go_packages() {
        assert_eq!(go_package(""), "./...");
        assert_eq!(go_package("."), ".");
        assert_eq!(go_package("handlers"), "./handlers");
        assert_eq!(go_package("models/user/"), "./models/user");
    }

    #[test]
    fn dist_build_adds_distribution_flags_and_target_env() {
        let cfg = config();
        let target = CrossTarget::from_pair(&cfg.distribution.as_ref().unwrap().cross_targets[0]).unwrap();
        let root = Path::new("/srv/web");
        let output = dist_binary_path(root, &cfg, &target);

        let cmd = build_command(root, &Toolchain::default(), &cfg, &output, Some(&target), true);

        assert_eq!(output, PathBuf::from("/srv/web/dist/webapp-linux-arm64"));
        let args: Vec<OsString> = ["build", "-o", "/srv/web/dist/webapp-linux-arm64", "-tags", "dev", "-ldflags=-s -w"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(cmd.get_args(), args.as_slice());
        assert_eq!(cmd.get_env("GOOS"), Some("linux"));
        assert_eq!(cmd.get_env("GOARCH"), Some("arm64"));
    }

    #[test]
    fn dev_build_has_no_distribution_flags() {
        let cfg = config();
        let root = Path::new("/srv/web");
        let cmd = build_command(root, &Toolchain::default(), &cfg, &binary_path(root, &cfg), None, false);
        assert_eq!(cmd.get_args().len(), 5);
        assert_eq!(cmd.get_env("GOOS"), None);
    }

    #[test]
    fn test_files_are_looked_up_per_module() {
        let fs = MockFileSystem::new();
        fs.add_file("/srv/web/main_test.go", "package main");
        fs.add_file("/srv/web/handlers/user.go", "package handlers");
        fs.add_file("/srv/web/models/user_test.go", "package models");
        let root = Path::new("/srv/web");

        assert!(module_has_tests(&fs, root, "."));
        assert!(module_has_tests(&fs, root, "models"));
        assert!(!module_has_tests(&fs, root, "handlers"));
        assert!(!module_has_tests(&fs, root, "deleted"));
    }

    #[test]
    fn cross_targets_must_be_pairs() {
        assert!(CrossTarget::from_pair(&["linux".to_string()]).is_none());
    }
}
