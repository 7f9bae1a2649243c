// src/exec/command.rs

//! Running one external build tool to completion.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{BuildwebError, Result};

use super::env::merge_env;

/// An external tool invocation: compiler, preprocessor, bundler, installer.
///
/// Stdout lines are forwarded to the log as they arrive. Stderr is forwarded
/// at debug level and also captured, so a failure carries the tool's own
/// diagnostics in [`BuildwebError::ToolFailed`].
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// `tool` is the short label used in logs and errors, e.g. `"go build"`.
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Run the tool and wait for it to exit.
    pub async fn run(self) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(merge_env(&self.env))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        debug!(tool = %self.tool, program = %self.program.display(), args = ?self.args, "spawning tool");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} ({})", self.tool, self.program.display()))?;

        let stdout_task = child.stdout.take().map(|stdout| {
            let tool = self.tool.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(tool = %tool, "{}", line);
                }
            })
        });

        // Always consume stderr so the pipe never fills up.
        let stderr_task = child.stderr.take().map(|stderr| {
            let tool = self.tool.clone();
            tokio::spawn(async move {
                let mut captured = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(tool = %tool, "stderr: {}", line);
                    captured.push_str(&line);
                    captured.push('\n');
                }
                captured
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for {}", self.tool))?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            debug!(tool = %self.tool, "tool finished");
            Ok(())
        } else {
            Err(BuildwebError::ToolFailed {
                tool: self.tool,
                status: status.to_string(),
                stderr,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_tool_reports_status_and_stderr() {
        let err = ToolCommand::new("broken tool", "sh")
            .args(["-c", "echo 'syntax error on line 3' >&2; exit 2"])
            .run()
            .await
            .unwrap_err();

        match err {
            BuildwebError::ToolFailed { tool, status, stderr } => {
                assert_eq!(tool, "broken tool");
                assert!(status.contains('2'), "status was {status}");
                assert_eq!(stderr.trim(), "syntax error on line 3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn overrides_reach_the_tool_environment() {
        let dir = tempfile::tempdir().unwrap();
        ToolCommand::new("env check", "sh")
            .args(["-c", "printf '%s' \"$NODE_ENV\" > node_env.txt"])
            .env("NODE_ENV", "production")
            .current_dir(dir.path())
            .run()
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("node_env.txt")).unwrap();
        assert_eq!(written, "production");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = ToolCommand::new("ghost", "/definitely/not/a/real/tool")
            .run()
            .await;
        assert!(matches!(result, Err(BuildwebError::Other(_))));
    }
}
