//! Logging setup for the CLI, on the `tracing` ecosystem.
//!
//! Verbosity comes from the global flags, with `RUST_LOG` as the escape
//! hatch for targeted filters.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber. Call once, before any logging.
///
/// `--verbose` wins over `--quiet`; with neither set, `RUST_LOG` is
/// honored and the default is info-level for the plinth crates.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("plinth_cli=debug,plinth_graph=debug,plinth_config=debug")
    } else if quiet {
        EnvFilter::new("plinth_cli=error,plinth_graph=error,plinth_config=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("plinth_cli=info,plinth_graph=info,plinth_config=info")
        })
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr);

    // try_init so tests can call this repeatedly.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
