// src/exec/supervisor.rs

//! Lifecycle of the single managed application process.
//!
//! State machine: `Stopped -> Starting -> Running -> Stopping -> Stopped`.
//! Only the scheduler worker drives it, through the build handler, so at most
//! one managed process exists at a time.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::errors::{BuildwebError, Result};

use super::env::merge_env;

/// Time the application gets to bind its listeners after spawning.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Time the application gets to exit after an interrupt.
pub const KILL_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub settle_delay: Duration,
    pub kill_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            kill_timeout: KILL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProcess {
    pub binary_path: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Trusted to exit on its own after an interrupt; never force-killed.
    pub graceful: bool,
}

impl ManagedProcess {
    /// Launch parameters from the `[package]` section, with `extra_args`
    /// (from the command line) appended after the configured ones.
    pub fn from_config(binary_path: PathBuf, config: &ProjectConfig, extra_args: &[String]) -> Self {
        let mut args = config.package.args.clone();
        args.extend(extra_args.iter().cloned());
        Self {
            binary_path,
            args,
            env: config.package.env.clone(),
            graceful: config.package.graceful,
        }
    }
}

/// How a [`ProcessSupervisor::kill`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// Nothing was running.
    NotRunning,
    /// The process exited after the interrupt.
    Exited,
    /// The process ignored the interrupt and was force-terminated.
    ForceKilled,
    /// The process is still running (graceful, or it could not be killed);
    /// the slot was freed anyway.
    Abandoned,
}

#[derive(Debug)]
pub struct ProcessSupervisor {
    options: SupervisorOptions,
    state: SupervisorState,
    child: Option<Child>,
    process: Option<ManagedProcess>,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(SupervisorOptions::default())
    }
}

impl ProcessSupervisor {
    pub fn new(options: SupervisorOptions) -> Self {
        Self {
            options,
            state: SupervisorState::Stopped,
            child: None,
            process: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Spawn `process` and wait for the settle delay.
    ///
    /// Fails if the supervisor is not stopped, if spawning fails, or if the
    /// process exits before the settle delay is over. The supervisor is
    /// `Stopped` again after any failure.
    pub async fn start(&mut self, process: ManagedProcess) -> Result<()> {
        if self.state != SupervisorState::Stopped {
            return Err(BuildwebError::SupervisorError(format!(
                "cannot start {} while the supervisor is {:?}",
                process.binary_path.display(),
                self.state
            )));
        }
        self.state = SupervisorState::Starting;

        // The console owns stdin; the application keeps stdout and stderr.
        let mut cmd = Command::new(&process.binary_path);
        cmd.args(&process.args)
            .env_clear()
            .envs(merge_env(&process.env))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(!process.graceful);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.state = SupervisorState::Stopped;
                return Err(BuildwebError::SupervisorError(format!(
                    "failed to start {}: {err}",
                    process.binary_path.display()
                )));
            }
        };
        debug!(pid = ?child.id(), binary = %process.binary_path.display(), "application spawned");

        tokio::time::sleep(self.options.settle_delay).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                self.state = SupervisorState::Stopped;
                return Err(BuildwebError::SupervisorError(format!(
                    "{} exited during start-up ({status})",
                    process.binary_path.display()
                )));
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "could not poll application status after start"),
        }

        info!(
            pid = ?child.id(),
            binary = %process.binary_path.display(),
            args = ?process.args,
            "application running"
        );
        self.child = Some(child);
        self.process = Some(process);
        self.state = SupervisorState::Running;
        Ok(())
    }

    /// Interrupt the running process and wait for it to go away.
    ///
    /// Never fails: problems are logged and the supervisor always ends up
    /// `Stopped`, so a later start can retry.
    pub async fn kill(&mut self) -> KillOutcome {
        let Some(mut child) = self.child.take() else {
            self.state = SupervisorState::Stopped;
            return KillOutcome::NotRunning;
        };
        let graceful = self.process.take().is_some_and(|p| p.graceful);
        self.state = SupervisorState::Stopping;

        if let Err(err) = interrupt(&mut child) {
            warn!(error = %err, "failed to interrupt application");
        }

        let outcome = match tokio::time::timeout(self.options.kill_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "application stopped");
                KillOutcome::Exited
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failed to wait for application to stop");
                KillOutcome::Abandoned
            }
            Err(_) if graceful => {
                warn!(
                    timeout_ms = self.options.kill_timeout.as_millis() as u64,
                    "graceful application still running; leaving it to exit on its own"
                );
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
                KillOutcome::Abandoned
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.options.kill_timeout.as_millis() as u64,
                    "application ignored the interrupt; force killing"
                );
                match child.kill().await {
                    Ok(()) => KillOutcome::ForceKilled,
                    Err(err) => {
                        warn!(error = %err, "failed to force kill application");
                        KillOutcome::Abandoned
                    }
                }
            }
        };

        self.state = SupervisorState::Stopped;
        outcome
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // `None` once the child has been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    kill(Pid::from_raw(pid as i32), Signal::SIGINT).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
