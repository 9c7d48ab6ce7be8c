//! The `build` command: one full pass, artifacts written to disk.

use std::fs;
use std::time::Instant;

use plinth_config::PlinthConfig;
use plinth_graph::{Emitter, GraphBuilder, ProcessRunner};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let root = args.cwd.canonicalize()?;

    let mut config = PlinthConfig::load(&root, args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }
    config.validate(&root)?;

    ui::info(&format!(
        "building {} in {} mode",
        config.entry.display(),
        config.mode
    ));
    let started = Instant::now();

    let mut builder = GraphBuilder::new(&config, &root, Box::new(ProcessRunner));
    let graph = builder.build()?;
    let artifacts = Emitter::new(&config, &root)?.emit(&graph)?;

    let out_dir = root.join(&config.out_dir);
    if out_dir == root {
        return Err(CliError::Config(plinth_config::ConfigError::InvalidValue {
            field: "out_dir".to_string(),
            message: "output directory must not be the project root".to_string(),
        }));
    }
    // Stale hashed artifacts from earlier builds would accumulate forever.
    if out_dir.is_dir() {
        fs::remove_dir_all(&out_dir)?;
    }
    plinth_graph::write_to(&artifacts, &out_dir)?;

    ui::success(&format!(
        "{} modules, {} files written to {} in {:.1?}",
        graph.len(),
        artifacts.files.len(),
        config.out_dir.display(),
        started.elapsed()
    ));
    Ok(())
}
