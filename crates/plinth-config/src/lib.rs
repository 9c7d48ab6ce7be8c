//! Configuration for the Plinth asset pipeline.
//!
//! All shared configuration (alias table, search roots, proxy rules, tool
//! commands) lives in one immutable [`PlinthConfig`] value constructed at
//! startup and passed to each component, never in ambient global state.

mod config;
mod dev;
mod error;
mod html;
mod resolve;
mod tools;

pub use config::{Mode, PlinthConfig, CONFIG_FILE};
pub use dev::{DevOptions, ProxyRule};
pub use error::{ConfigError, Result};
pub use html::{AnalyticsOptions, EditorOptions, HtmlOptions, PerMode};
pub use resolve::ResolveOptions;
pub use tools::{TokenOptions, ToolCommand, ToolOptions};
