//! External compiler and preprocessor commands.
//!
//! The pipeline drives three external collaborators: the functional-language
//! compiler, the typed-script checker/transpiler, and the stylesheet
//! preprocessor. Each is an ordinary subprocess configured here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOptions {
    /// Compiler for `.purs` sources.
    #[serde(default = "default_functional")]
    pub functional: ToolCommand,

    /// Type-checker/transpiler for `.ts`/`.tsx` sources.
    #[serde(default = "default_typescript")]
    pub typescript: ToolCommand,

    /// Preprocessor for `.scss` sources.
    #[serde(default = "default_sass")]
    pub sass: ToolCommand,

    /// When unset, type errors are fatal in production mode and demoted to
    /// warnings in development mode.
    #[serde(default)]
    pub strict_types: Option<bool>,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            functional: default_functional(),
            typescript: default_typescript(),
            sass: default_sass(),
            strict_types: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }
}

/// Opaque design-token table (colors, spacing, fonts) handed to the
/// stylesheet preprocessor as an include path. Not interpreted by plinth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenOptions {
    #[serde(default)]
    pub table: Option<PathBuf>,
}

fn default_functional() -> ToolCommand {
    ToolCommand::new("purs")
}

fn default_typescript() -> ToolCommand {
    ToolCommand::new("tsc")
}

fn default_sass() -> ToolCommand {
    ToolCommand::new("sass")
}
