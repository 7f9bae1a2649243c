// src/exec/deps.rs

//! Dependency installation for both ecosystems.

use std::path::Path;

use tracing::info;

use crate::config::ProjectConfig;
use crate::errors::Result;

use super::command::ToolCommand;
use super::toolchain::Toolchain;

/// `go get <dep>` for every `[package].deps` entry, in order.
pub async fn install_package_deps(root: &Path, toolchain: &Toolchain, config: &ProjectConfig) -> Result<()> {
    let deps = &config.package.dependencies;
    if deps.is_empty() {
        return Ok(());
    }

    info!(count = deps.len(), "installing package dependencies");
    let go = Toolchain::resolve(root, &toolchain.go);
    for dep in deps {
        info!(dependency = %dep, "go get");
        ToolCommand::new("go get", &go)
            .arg("get")
            .arg(dep)
            .current_dir(root)
            .run()
            .await?;
    }
    info!(deps = ?deps, "package dependencies installed");
    Ok(())
}

/// `npm install <dep>` for every `[assets].deps` entry, in order.
pub async fn install_asset_deps(root: &Path, toolchain: &Toolchain, config: &ProjectConfig) -> Result<()> {
    let deps = config.asset_dependencies();
    if deps.is_empty() {
        return Ok(());
    }

    info!(count = deps.len(), "installing asset dependencies");
    let npm = Toolchain::resolve(root, &toolchain.npm);
    for dep in deps {
        info!(dependency = %dep, "npm install");
        ToolCommand::new("npm install", &npm)
            .arg("install")
            .arg(dep)
            .current_dir(root)
            .run()
            .await?;
    }
    info!(deps = ?deps, "asset dependencies installed");
    Ok(())
}

/// Both ecosystems, package dependencies first.
pub async fn install_all(root: &Path, toolchain: &Toolchain, config: &ProjectConfig) -> Result<()> {
    install_package_deps(root, toolchain, config).await?;
    install_asset_deps(root, toolchain, config).await
}
