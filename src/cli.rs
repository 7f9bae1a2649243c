// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `buildweb`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildweb",
    version,
    about = "Watch a web project, rebuild its binary and assets, and keep it running.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    ///
    /// The directory containing it is treated as the project root.
    #[arg(long, value_name = "PATH", default_value = "project.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDWEB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Watch for file changes, rebuild, and run the application.
    Run {
        /// Build assets with production settings (minified, no source maps).
        #[arg(long)]
        production: bool,

        /// Extra arguments passed to the application binary.
        #[arg(last = true, value_name = "APP_ARGS")]
        app_args: Vec<String>,
    },
    /// Build production assets and the binary for every distribution target.
    Dist,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
