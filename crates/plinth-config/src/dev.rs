//! Development server configuration types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevOptions {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub https: bool,

    #[serde(default)]
    pub open: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path prefixes forwarded verbatim to an upstream origin. Static for
    /// the lifetime of the dev server process.
    #[serde(default = "default_proxy")]
    pub proxy: IndexMap<String, ProxyRule>,

    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            https: false,
            open: false,
            debounce_ms: default_debounce_ms(),
            proxy: default_proxy(),
            watch_ignore: default_watch_ignore(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRule {
    /// Upstream origin requests are forwarded to, e.g. `http://127.0.0.1:8080`.
    pub target: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8009
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_proxy() -> IndexMap<String, ProxyRule> {
    let mut proxy = IndexMap::new();
    proxy.insert(
        "/api".to_string(),
        ProxyRule {
            target: "http://127.0.0.1:8080".to_string(),
        },
    );
    proxy
}

fn default_watch_ignore() -> Vec<String> {
    ["node_modules", ".git", "dist", "output", "*.log", ".DS_Store"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
