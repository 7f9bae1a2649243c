// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildwebError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Asset entry not found: {0}")]
    EntryNotFound(String),

    /// An external tool (compiler, bundler, preprocessor, installer) exited
    /// unsuccessfully.
    #[error("{tool} failed ({status}){}", format_stderr(.stderr))]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Process supervisor error: {0}")]
    SupervisorError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildwebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failure_includes_trimmed_stderr() {
        let err = BuildwebError::ToolFailed {
            tool: "go build".to_string(),
            status: "exit status: 2".to_string(),
            stderr: "  main.go:3: undefined: foo\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "go build failed (exit status: 2):\nmain.go:3: undefined: foo"
        );
    }

    #[test]
    fn tool_failure_without_stderr_is_one_line() {
        let err = BuildwebError::ToolFailed {
            tool: "npm install".to_string(),
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "npm install failed (exit status: 1)");
    }
}
