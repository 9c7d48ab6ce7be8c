//! Binary entry point: parse arguments, initialize logging, dispatch.

use clap::Parser;
use plinth_cli::{cli, commands, logger, ui};

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build::execute(build_args).await,
        cli::Command::Dev(dev_args) => commands::dev::execute(dev_args).await,
    };

    if let Err(error) = result {
        ui::error(&error.to_string());
        std::process::exit(1);
    }
}
