//! CLI error type, aggregating the library errors plus the concerns only
//! the binary has (serving, watching).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] plinth_config::ConfigError),

    #[error(transparent)]
    Graph(#[from] plinth_graph::GraphError),

    #[error("server error: {0}")]
    Server(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
