//! Top-level configuration structure and loading.
//!
//! Configuration is assembled from three layers, later layers winning:
//! built-in defaults, an optional `plinth.config.json` in the project
//! root, and `PLINTH_*` environment variables. The result is immutable
//! for the lifetime of the process and handed by reference to every
//! component, keeping the resolver and graph builder independently
//! testable.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::dev::DevOptions;
use crate::error::{ConfigError, Result};
use crate::html::HtmlOptions;
use crate::resolve::ResolveOptions;
use crate::tools::{TokenOptions, ToolOptions};

/// Conventional config file name searched for in the project root.
pub const CONFIG_FILE: &str = "plinth.config.json";

/// Build mode. Controls minification, type-error severity, watch
/// behavior, and which analytics IDs the shell receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlinthConfig {
    /// Bundle entry point, relative to the project root.
    #[serde(default = "default_entry")]
    pub entry: PathBuf,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub resolve: ResolveOptions,

    #[serde(default)]
    pub html: HtmlOptions,

    #[serde(default)]
    pub tools: ToolOptions,

    #[serde(default)]
    pub tokens: TokenOptions,

    #[serde(default)]
    pub dev: DevOptions,
}

impl Default for PlinthConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            out_dir: default_out_dir(),
            mode: Mode::default(),
            resolve: ResolveOptions::default(),
            html: HtmlOptions::default(),
            tools: ToolOptions::default(),
            tokens: TokenOptions::default(),
            dev: DevOptions::default(),
        }
    }
}

impl PlinthConfig {
    /// Load configuration for a project root.
    ///
    /// `file` overrides the conventional `plinth.config.json` location.
    /// A missing conventional file is fine; an explicitly named file that
    /// does not exist is an error.
    pub fn load(root: &Path, file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(PlinthConfig::default()));

        match file {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                };
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path));
                }
                figment = figment.merge(Json::file(&path));
            }
            None => {
                let conventional = root.join(CONFIG_FILE);
                if conventional.exists() {
                    tracing::debug!(path = %conventional.display(), "merging config file");
                    figment = figment.merge(Json::file(&conventional));
                }
            }
        }

        let config: PlinthConfig = figment
            .merge(Env::prefixed("PLINTH_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate filesystem-facing settings against a project root.
    ///
    /// Search roots are deliberately not checked for existence: a root
    /// like `generated/` only appears once a compiler has run, and the
    /// resolver skips roots that are not there.
    pub fn validate(&self, root: &Path) -> Result<()> {
        let entry = root.join(&self.entry);
        if !entry.exists() {
            return Err(ConfigError::EntryNotFound(entry));
        }

        if let Some(template) = &self.html.template {
            let template = root.join(template);
            if !template.exists() {
                return Err(ConfigError::TemplateNotFound(template));
            }
        }

        if self.resolve.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "resolve.extensions".to_string(),
                message: "at least one extension is required".to_string(),
            });
        }

        for (prefix, rule) in &self.dev.proxy {
            if !prefix.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: format!("dev.proxy.{prefix}"),
                    message: "proxy prefixes must start with '/'".to_string(),
                });
            }
            if rule.target.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("dev.proxy.{prefix}"),
                    message: "proxy target must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Whether type errors from the typed-script chain abort the pass.
    /// Explicit config wins; otherwise production is strict and
    /// development is permissive.
    pub fn strict_types(&self) -> bool {
        self.tools.strict_types.unwrap_or(self.mode.is_production())
    }
}

fn default_entry() -> PathBuf {
    PathBuf::from("entry.js")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}
