//! # plinth-cli
//!
//! The `plinth` binary: a `build` command that runs one pass and writes
//! artifacts to disk, and a `dev` command that serves artifacts from
//! memory, watches the project, and pushes reloads over SSE.

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
