// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that spawns an OS process lives here:
//!
//! - [`command`] runs one external build tool to completion and turns a
//!   non-zero exit into [`crate::errors::BuildwebError::ToolFailed`].
//! - [`supervisor`] owns the long-running application process.
//! - [`deps`] installs compiler and asset-tool dependencies.
//! - [`toolchain`] locates the tools; [`env`] builds their environment.

pub mod command;
pub mod deps;
pub mod env;
pub mod supervisor;
pub mod toolchain;

pub use command::ToolCommand;
pub use supervisor::{
    KillOutcome, ManagedProcess, ProcessSupervisor, SupervisorOptions, SupervisorState,
};
pub use toolchain::Toolchain;
