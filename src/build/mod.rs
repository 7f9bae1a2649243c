// src/build/mod.rs

//! Task bodies: the binary build and test steps, and the [`BuildHandler`]
//! that dispatches scheduler tasks to them and to the asset drivers.

pub mod binary;
pub mod handler;

pub use binary::CrossTarget;
pub use handler::BuildHandler;
