//! Development mode: rebuild loop, in-memory serving, live reload.

pub mod overlay;
pub mod server;
pub mod state;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use plinth_config::PlinthConfig;
use plinth_graph::{Emitter, GraphBuilder, ProcessRunner};

use crate::error::Result;
use crate::ui;

pub use server::{router, serve, ServerContext};
pub use state::{BuildStatus, DevEvent, DevState, ServeSnapshot};
pub use watcher::FileWatcher;

/// One dev session: owns the incremental builder and emitter and turns
/// change batches into numbered passes.
pub struct DevSession {
    builder: Mutex<GraphBuilder>,
    emitter: Emitter,
    state: Arc<DevState>,
    passes: AtomicU64,
}

impl DevSession {
    pub fn new(config: &PlinthConfig, root: &Path, state: Arc<DevState>) -> Result<Self> {
        Ok(Self {
            builder: Mutex::new(GraphBuilder::new(config, root, Box::new(ProcessRunner))),
            emitter: Emitter::new(config, root)?,
            state,
            passes: AtomicU64::new(0),
        })
    }

    /// Run one pass. Blocking; callers run this on a blocking thread.
    ///
    /// A failed pass leaves the last good snapshot in place: browsers keep
    /// the working page and receive the diagnostic over the event stream.
    pub fn rebuild(&self, changed: &[PathBuf]) {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.set_status(BuildStatus::Building { pass });
        let started = Instant::now();

        // One pass at a time; the lock also orders pass numbers with
        // snapshot installation.
        let mut builder = self.builder.lock();
        if !changed.is_empty() {
            builder.invalidate(changed);
        }

        let result = builder
            .build()
            .and_then(|graph| self.emitter.emit(&graph));

        match result {
            Ok(artifacts) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let files = artifacts.files.len();
                let installed = self.state.install_snapshot(ServeSnapshot {
                    pass,
                    files: artifacts.files,
                    shell: artifacts.shell,
                });
                if installed {
                    self.state
                        .set_status(BuildStatus::Serving { pass, duration_ms });
                    self.state.notify(DevEvent::Reload);
                    ui::success(&format!("pass {pass}: {files} files in {duration_ms}ms"));
                }
            }
            Err(error) => {
                let message = error.to_string();
                ui::error(&message);
                self.state.set_status(BuildStatus::Failed {
                    pass,
                    error: message.clone(),
                });
                self.state.notify(DevEvent::Error { message });
            }
        }
    }
}
