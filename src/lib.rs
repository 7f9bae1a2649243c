// src/lib.rs

pub mod assets;
pub mod build;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::assets::AssetContext;
use crate::build::BuildHandler;
use crate::build::binary::{self, CrossTarget};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigStore, ProjectConfig, load_and_validate, project_root_dir};
use crate::engine::{Scheduler, SchedulerOptions, Task, TaskFailure, TaskKind, full_build_tasks};
use crate::exec::deps::install_all;
use crate::exec::{ProcessSupervisor, Toolchain};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{ChangeClassifier, spawn_watcher};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let config = load_and_validate(&config_path)?;

    // Canonicalize once so notify paths strip cleanly.
    let root = project_root_dir(&config_path);
    let root = root.canonicalize().unwrap_or(root);
    let toolchain = Toolchain::from_env();

    info!(
        name = %config.package.name,
        root = %root.display(),
        "project loaded"
    );

    match args.command {
        Command::Run {
            production,
            app_args,
        } => run_dev(&config_path, root, config, toolchain, production, app_args).await,
        Command::Dist => run_dist(root, config, toolchain).await,
    }
}

/// Watch, rebuild and keep the application running until Ctrl-C or `quit`.
async fn run_dev(
    config_path: &Path,
    root: PathBuf,
    config: ProjectConfig,
    toolchain: Toolchain,
    production: bool,
    app_args: Vec<String>,
) -> Result<()> {
    install_all(&root, &toolchain, &config).await?;

    let store = ConfigStore::new(config);
    let ctx = AssetContext::new(&root, production, toolchain);
    let handler = BuildHandler::new(ctx, ProcessSupervisor::default(), app_args);
    let (scheduler, handle) = Scheduler::new(handler, store.clone(), SchedulerOptions::default());
    let mut worker = tokio::spawn(scheduler.run());

    handle.execute_and_restart(full_build_tasks())?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let config_file = config_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project.toml".to_string());
    let classifier = ChangeClassifier::new(&root, config_file, Arc::clone(&fs))?;
    let _watcher = spawn_watcher(classifier, fs, store, handle.clone())?;

    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel();
    let console = tokio::spawn(console::run_console(handle.clone(), quit_tx.clone()));
    info!("{}", console::HELP);

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!(error = %err, "failed to listen for Ctrl+C");
            }
            info!("interrupted; shutting down");
        }
        _ = quit_rx.recv() => {}
        joined = &mut worker => {
            console.abort();
            return match joined {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(err)) => Err(err.into()),
                Err(err) => bail!("scheduler worker panicked: {err}"),
            };
        }
    }
    drop(quit_tx);
    console.abort();

    // The worker stops the application on its way out.
    handle.shutdown()?;
    let outstanding = worker.await??;
    report_outstanding(&outstanding);
    Ok(())
}

/// Production assets and distribution binaries.
async fn run_dist(root: PathBuf, config: ProjectConfig, toolchain: Toolchain) -> Result<()> {
    install_all(&root, &toolchain, &config).await?;

    let store = ConfigStore::new(config.clone());
    let ctx = AssetContext::new(&root, true, toolchain.clone());
    let handler = BuildHandler::new(ctx, ProcessSupervisor::default(), Vec::new());
    let (scheduler, handle) = Scheduler::new(handler, store, SchedulerOptions::default());

    handle.execute([
        Task::all(TaskKind::BuildImages),
        Task::all(TaskKind::BuildStyles),
        Task::all(TaskKind::BuildJavaScripts),
        Task::all(TaskKind::RegenerateAssetsMapping),
    ])?;
    handle.shutdown()?;

    let outstanding = scheduler.run().await?;
    if !outstanding.is_empty() {
        report_outstanding(&outstanding);
        bail!("{} asset task(s) failed; not building distribution binaries", outstanding.len());
    }

    let targets: Vec<CrossTarget> = config
        .distribution
        .iter()
        .flat_map(|d| d.cross_targets.iter())
        .filter_map(|pair| CrossTarget::from_pair(pair))
        .collect();

    if targets.is_empty() {
        binary::build_dist(&root, &toolchain, &config, None).await?;
    } else {
        for target in targets.iter() {
            info!(os = %target.os, arch = %target.arch, "cross-compiling");
            binary::build_dist(&root, &toolchain, &config, Some(target)).await?;
        }
    }

    info!("distribution build complete");
    Ok(())
}

fn report_outstanding(failures: &[TaskFailure]) {
    for failure in failures {
        error!(task = %failure.task, error = %failure.message, "task still failing");
    }
}
