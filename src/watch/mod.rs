// src/watch/mod.rs

//! File watching and change classification.
//!
//! This module is responsible for:
//! - Registering a non-recursive `notify` watch on every project directory
//!   outside the ignore list, and keeping that set current as directories
//!   come and go.
//! - Turning raw paths into scheduler tasks ([`ChangeClassifier`]).
//! - Handing a changed project file to the worker for a hot reload.
//!
//! Debouncing is not done here: classified tasks are handed to the
//! scheduler, whose flush ticker batches them.

pub mod classify;
pub mod path_utils;
pub mod watcher;

pub use classify::{ChangeClassifier, Classification};
pub use watcher::{WatcherHandle, collect_watch_dirs, spawn_watcher};
