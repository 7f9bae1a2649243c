// src/build/handler.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assets::{self, AssetContext, AssetKind, images, mapping, scripts, styles};
use crate::config::ProjectConfig;
use crate::engine::{DependencyChanges, HandlerFuture, Task, TaskHandler, TaskKind};
use crate::exec::deps::{install_asset_deps, install_package_deps};
use crate::exec::{KillOutcome, ManagedProcess, ProcessSupervisor};
use crate::fs::RealFileSystem;

use super::binary;

/// Production [`TaskHandler`]: runs the real tools and owns the managed
/// application process.
#[derive(Debug)]
pub struct BuildHandler {
    ctx: AssetContext,
    supervisor: ProcessSupervisor,
    binary_path: Option<PathBuf>,
    app_args: Vec<String>,
}

impl BuildHandler {
    pub fn new(ctx: AssetContext, supervisor: ProcessSupervisor, app_args: Vec<String>) -> Self {
        Self {
            ctx,
            supervisor,
            binary_path: None,
            app_args,
        }
    }

    async fn execute(&mut self, task: Task, config: Arc<ProjectConfig>) -> crate::errors::Result<()> {
        let target = task.target.as_str();
        match task.kind {
            TaskKind::BuildImages => images::build(&self.ctx, &config, target).await,
            TaskKind::BuildStyles => styles::build(&self.ctx, &config, target).await,
            TaskKind::BuildJavaScripts => scripts::build(&self.ctx, &config, target).await,
            TaskKind::RegenerateAssetsMapping => {
                if config.assets.is_none() {
                    debug!("no [assets] section; not writing an assets mapping");
                    return Ok(());
                }
                mapping::regenerate(&self.ctx.root, &config).map(|_| ())
            }
            TaskKind::RunBinaryTests => binary::run_tests(&self.ctx.root, &self.ctx.toolchain, target).await,
            TaskKind::BuildBinary => {
                let path = binary::build(&self.ctx.root, &self.ctx.toolchain, &config).await?;
                self.binary_path = Some(path);
                Ok(())
            }
            TaskKind::RestartBinary => self.restart(config).await,
        }
    }

    async fn restart(&mut self, config: Arc<ProjectConfig>) -> crate::errors::Result<()> {
        let outcome = self.supervisor.kill().await;
        debug!(?outcome, "previous application instance stopped");

        let Some(path) = self.binary_path.clone() else {
            warn!("no application binary has been built yet; nothing to start");
            return Ok(());
        };
        let process = ManagedProcess::from_config(path, &config, &self.app_args);
        self.supervisor.start(process).await?;
        info!(name = %config.package.name, pid = ?self.supervisor.pid(), "application restarted");
        Ok(())
    }
}

impl TaskHandler for BuildHandler {
    fn install_dependencies(&mut self, changes: DependencyChanges, config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        Box::pin(async move {
            if changes.package {
                install_package_deps(&self.ctx.root, &self.ctx.toolchain, &config).await?;
            }
            if changes.assets {
                install_asset_deps(&self.ctx.root, &self.ctx.toolchain, &config).await?;
            }
            Ok(())
        })
    }

    fn reset_category(&mut self, kind: TaskKind) -> HandlerFuture<'_> {
        Box::pin(async move {
            if let Some(asset_kind) = AssetKind::from_task_kind(kind) {
                let dir = self.ctx.output_dir(asset_kind);
                debug!(dir = %dir.display(), "resetting output directory");
                assets::reset_dir(&dir)?;
            }
            Ok(())
        })
    }

    fn run_task(&mut self, task: Task, config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        Box::pin(self.execute(task, config))
    }

    fn restart_binary(&mut self, config: Arc<ProjectConfig>) -> HandlerFuture<'_> {
        Box::pin(self.restart(config))
    }

    fn shutdown(&mut self) -> HandlerFuture<'_> {
        Box::pin(async move {
            if self.supervisor.kill().await != KillOutcome::NotRunning {
                info!("application stopped");
            }
            Ok(())
        })
    }

    fn is_current(&self, task: &Task, _config: &ProjectConfig) -> bool {
        match task.kind {
            TaskKind::RunBinaryTests => binary::module_has_tests(&RealFileSystem, &self.ctx.root, &task.target),
            _ => true,
        }
    }
}
