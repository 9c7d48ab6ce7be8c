//! HTML shell and embedded-widget configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Mode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlOptions {
    /// Optional template overriding the built-in shell.
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Favicon copied into the output directory and referenced by the shell.
    #[serde(default)]
    pub favicon: Option<PathBuf>,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_product_name")]
    pub product_name: String,

    #[serde(default)]
    pub analytics: AnalyticsOptions,

    #[serde(default)]
    pub editor: EditorOptions,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            template: None,
            favicon: None,
            title: default_title(),
            product_name: default_product_name(),
            analytics: AnalyticsOptions::default(),
            editor: EditorOptions::default(),
        }
    }
}

/// Third-party analytics IDs injected into the shell, selected by mode so
/// development traffic never pollutes production properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsOptions {
    #[serde(default)]
    pub google: PerMode,

    #[serde(default)]
    pub segment: PerMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerMode {
    #[serde(default = "placeholder")]
    pub development: String,

    #[serde(default = "placeholder")]
    pub production: String,
}

impl Default for PerMode {
    fn default() -> Self {
        Self {
            development: placeholder(),
            production: placeholder(),
        }
    }
}

impl PerMode {
    pub fn for_mode(&self, mode: Mode) -> &str {
        match mode {
            Mode::Development => &self.development,
            Mode::Production => &self.production,
        }
    }
}

/// Configuration for the embedded code-editor widget. The widget itself is
/// an external collaborator; only its selection is modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorOptions {
    /// Syntax-highlighting modes the widget is built with.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            languages: default_languages(),
        }
    }
}

fn default_title() -> String {
    "Playground".to_string()
}

fn default_product_name() -> String {
    "playground".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["haskell".to_string()]
}

fn placeholder() -> String {
    "X".repeat(8)
}
