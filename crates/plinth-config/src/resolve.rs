//! Module resolution configuration: search roots, aliases, extension order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Static resolver configuration.
///
/// Read-only for the lifetime of a build pass. The resolver consults the
/// alias table first, then the importer's directory for relative
/// specifiers, then each search root in declared order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Search roots tried in declared order for bare specifiers.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Alias table applied by exact prefix match before any other step.
    #[serde(default = "default_alias")]
    pub alias: IndexMap<String, PathBuf>,

    /// Extension priority for extensionless specifiers. The
    /// domain-specific source extension comes first.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            alias: default_alias(),
            extensions: default_extensions(),
        }
    }
}

fn default_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("src"),
        PathBuf::from("generated"),
        PathBuf::from("web-common"),
    ]
}

fn default_alias() -> IndexMap<String, PathBuf> {
    let mut alias = IndexMap::new();
    alias.insert("static".to_string(), PathBuf::from("static"));
    alias.insert("src".to_string(), PathBuf::from("src"));
    alias
}

fn default_extensions() -> Vec<String> {
    ["purs", "js", "ts", "tsx"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
