//! Transformation chains.
//!
//! Each file category has a fixed, ordered chain of steps turning raw
//! file contents into a compiled representation plus the dependency
//! specifiers discovered along the way. Chains are pure with respect to
//! their inputs: identical bytes (and identical tool configuration)
//! always produce identical output, which is what makes unit caching
//! sound.
//!
//! External compilers are invoked through the [`ToolRunner`] trait so
//! tests can substitute a stub for the real subprocesses.

mod asset;
mod functional;
mod script;
mod stylesheet;

use std::path::{Path, PathBuf};
use std::process::Command;

use plinth_config::{Mode, PlinthConfig, ToolCommand};

use crate::category::FileCategory;
use crate::error::{GraphError, Result};
use crate::scan;

/// Compiled representation of a module, by output kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleBody {
    /// Executable module code destined for the JS bundle.
    Script(String),
    /// Extracted CSS text, concatenated into the stylesheet artifact.
    Stylesheet(String),
    /// Binary passthrough copied under a content-hashed name; the module
    /// itself becomes a URL reference.
    Asset { file_name: String, bytes: Vec<u8> },
}

/// Result of running one file through its chain.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub body: ModuleBody,
    /// Dependency specifiers in source order, not yet resolved.
    pub deps: Vec<String>,
}

/// Captured outcome of an external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam for invoking external compilers and preprocessors.
pub trait ToolRunner: Send + Sync {
    fn run(&self, tool: &ToolCommand, extra_args: &[String], input: &Path) -> Result<ToolOutcome>;
}

/// Production runner: spawns the configured command as a subprocess.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, tool: &ToolCommand, extra_args: &[String], input: &Path) -> Result<ToolOutcome> {
        let output = Command::new(&tool.command)
            .args(&tool.args)
            .args(extra_args)
            .arg(input)
            .output()
            .map_err(|e| GraphError::Tool {
                command: tool.command.clone(),
                path: input.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(ToolOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// The full set of transformation chains for one build configuration.
///
/// Holds only immutable configuration plus the tool runner; safe to share
/// across worker threads.
pub struct ChainSet {
    mode: Mode,
    strict_types: bool,
    tools: plinth_config::ToolOptions,
    token_table: Option<PathBuf>,
    /// Absolute source search directories handed to the functional compiler.
    source_dirs: Vec<PathBuf>,
    runner: Box<dyn ToolRunner>,
}

impl ChainSet {
    pub fn new(config: &PlinthConfig, project_root: &Path, runner: Box<dyn ToolRunner>) -> Self {
        let source_dirs = config
            .resolve
            .roots
            .iter()
            .map(|root| project_root.join(root))
            .collect();
        Self {
            mode: config.mode,
            strict_types: config.strict_types(),
            tools: config.tools.clone(),
            token_table: config.tokens.table.as_ref().map(|t| project_root.join(t)),
            source_dirs,
            runner,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Run a file through its category's chain.
    pub fn transform(
        &self,
        path: &Path,
        category: FileCategory,
        bytes: &[u8],
    ) -> Result<TransformOutput> {
        match category {
            FileCategory::Asset => asset::transform(path, bytes),
            _ => {
                let source = std::str::from_utf8(bytes).map_err(|_| GraphError::Compile {
                    path: path.to_path_buf(),
                    line: None,
                    column: None,
                    message: "source file is not valid UTF-8".to_string(),
                })?;
                match category {
                    FileCategory::Functional => functional::transform(self, path, source),
                    FileCategory::TypedScript => script::transform_typed(self, path, source),
                    FileCategory::Script => script::transform_plain(path, source),
                    FileCategory::Preprocessed => stylesheet::transform_preprocessed(self, path, source),
                    FileCategory::Stylesheet => stylesheet::transform_css(self, path, source),
                    FileCategory::Asset => unreachable!(),
                }
            }
        }
    }

    pub(crate) fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    pub(crate) fn tools(&self) -> &plinth_config::ToolOptions {
        &self.tools
    }

    pub(crate) fn strict_types(&self) -> bool {
        self.strict_types
    }

    pub(crate) fn token_table(&self) -> Option<&Path> {
        self.token_table.as_deref()
    }

    pub(crate) fn source_dirs(&self) -> &[PathBuf] {
        &self.source_dirs
    }
}

/// Pull a `line:column` position out of a tool diagnostic, if present.
pub(crate) fn parse_position(diagnostic: &str) -> (Option<u32>, Option<u32>) {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static POSITION: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?:line\s+|:)(\d+)(?:(?:,\s*column\s+|:)(\d+))?").unwrap());

    match POSITION.captures(diagnostic) {
        Some(captures) => {
            let line = captures.get(1).and_then(|m| m.as_str().parse().ok());
            let column = captures.get(2).and_then(|m| m.as_str().parse().ok());
            (line, column)
        }
        None => (None, None),
    }
}

/// Shared scan shortcut used by the script-flavored chains.
pub(crate) fn scan_deps(category: FileCategory, source: &str) -> Vec<String> {
    scan::dependencies(category, source)
}
