//! The `dev` command: initial pass, watch loop, HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use plinth_config::{Mode, PlinthConfig, CONFIG_FILE};

use crate::cli::DevArgs;
use crate::dev::{self, DevSession, DevState, FileWatcher, ServerContext};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs) -> Result<()> {
    let root = args.cwd.canonicalize()?;

    let mut config = PlinthConfig::load(&root, args.config.as_deref())?;
    // The dev server is development semantics by definition: permissive
    // type checking, no minification, dev analytics IDs.
    config.mode = Mode::Development;
    if let Some(port) = args.port {
        config.dev.port = port;
    }
    if let Some(host) = args.host {
        config.dev.host = host;
    }
    if args.open {
        config.dev.open = true;
    }
    if args.https {
        config.dev.https = true;
    }
    if config.dev.https {
        ui::warning("https is terminated by a local reverse proxy; binding plain HTTP");
    }
    config.validate(&root)?;

    let state = Arc::new(DevState::new());
    let session = Arc::new(DevSession::new(&config, &root, state.clone())?);

    // First pass runs in the background; the server comes up immediately
    // and serves the overlay until the pass lands.
    {
        let session = session.clone();
        tokio::task::spawn_blocking(move || session.rebuild(&[]));
    }

    let (watcher, rx) = FileWatcher::new(&root, config.dev.watch_ignore.clone())?;
    tokio::spawn(rebuild_loop(
        watcher,
        rx,
        session,
        Duration::from_millis(config.dev.debounce_ms),
    ));

    let ctx = ServerContext {
        state,
        proxy: config.dev.proxy.clone(),
        client: reqwest::Client::new(),
    };
    dev::serve(&config.dev.host, config.dev.port, ctx, config.dev.open).await
}

/// Coalesce change events into batches: a batch is rebuilt once no new
/// event has arrived for a full debounce window.
async fn rebuild_loop(
    watcher: FileWatcher,
    mut rx: tokio::sync::mpsc::Receiver<PathBuf>,
    session: Arc<DevSession>,
    debounce: Duration,
) {
    // Keeps the native watcher alive for the whole loop.
    let _watcher = watcher;
    let mut pending: Vec<PathBuf> = Vec::new();

    loop {
        tokio::select! {
            changed = rx.recv() => {
                match changed {
                    Some(path) => {
                        if path.file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILE) {
                            ui::warning("configuration changed; restart the dev server to apply it");
                            continue;
                        }
                        if !pending.contains(&path) {
                            pending.push(path);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                let batch = std::mem::take(&mut pending);
                tracing::info!(changed = batch.len(), "rebuilding");
                let session = session.clone();
                // Wait for the pass so batches stay ordered.
                let _ = tokio::task::spawn_blocking(move || session.rebuild(&batch)).await;
            }
        }
    }
}
