//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use plinth_config::Mode;

#[derive(Debug, Parser)]
#[command(
    name = "plinth",
    version,
    about = "Asset pipeline: build content-hashed bundles or serve them with live reload"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one full pass and write artifacts to the output directory.
    Build(BuildArgs),
    /// Start the development server with watch mode and live reload.
    Dev(DevArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Build mode, overriding the config file.
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Config file path (default: plinth.config.json in the project root).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory, overriding the config file.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Project root.
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,
}

#[derive(Debug, Args)]
pub struct DevArgs {
    /// Port to bind (the next free port is tried when taken).
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Open the browser once the server is up.
    #[arg(long)]
    pub open: bool,

    /// Mark the served origin as https (TLS termination happens in a
    /// local reverse proxy; the server itself speaks plain HTTP).
    #[arg(long)]
    pub https: bool,

    /// Config file path (default: plinth.config.json in the project root).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project root.
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,
}

fn parse_mode(value: &str) -> Result<Mode, String> {
    match value {
        "development" | "dev" => Ok(Mode::Development),
        "production" | "prod" => Ok(Mode::Production),
        other => Err(format!(
            "unknown mode '{other}' (expected 'development' or 'production')"
        )),
    }
}
