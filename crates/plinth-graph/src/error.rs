//! Error types for graph construction and emission.
//!
//! Pass-level failures always carry the originating path so the CLI can
//! report exactly which file and specifier broke the build.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A specifier could not be mapped to a file. Fatal to the pass.
    #[error("cannot resolve '{specifier}' imported from {}", .importer.display())]
    Resolution {
        specifier: String,
        importer: PathBuf,
    },

    /// A transformation step rejected its input. Carries the original
    /// diagnostic text from the external tool, never a paraphrase.
    #[error("compile error in {}{}: {message}", .path.display(), position(.line, .column))]
    Compile {
        path: PathBuf,
        line: Option<u32>,
        column: Option<u32>,
        message: String,
    },

    /// An external tool could not be spawned at all.
    #[error("failed to run '{command}' for {}: {message}", .path.display())]
    Tool {
        command: String,
        path: PathBuf,
        message: String,
    },

    /// Filesystem write failure. Fatal; partially written artifacts are
    /// rolled back before this surfaces.
    #[error("emit failed: {0}")]
    Emit(String),

    #[error("shell template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn position(line: &Option<u32>, column: &Option<u32>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(":{line}:{column}"),
        (Some(line), None) => format!(":{line}"),
        _ => String::new(),
    }
}
