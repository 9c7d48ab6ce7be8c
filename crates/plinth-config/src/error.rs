//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Filesystem validation errors (for CLI use)
    #[error("entry path not found: {0}")]
    EntryNotFound(PathBuf),

    #[error("HTML template not found: {0}")]
    TemplateNotFound(PathBuf),

    // Config parsing/loading errors
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid config value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
