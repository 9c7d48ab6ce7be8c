//! Shared state between the build loop and the dev server.
//!
//! The server always serves from an immutable snapshot of the last
//! successful pass. Rebuilds produce a new snapshot and swap it in
//! atomically; snapshots carry a monotonically increasing pass number so
//! a slow pass can never overwrite a newer one.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Immutable artifact set from one successful pass.
#[derive(Debug)]
pub struct ServeSnapshot {
    pub pass: u64,
    /// Served path (no leading slash) to content.
    pub files: IndexMap<String, Vec<u8>>,
    /// Rendered HTML shell, served for `/` and SPA routes.
    pub shell: String,
}

/// Where the build loop currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Idle,
    Building { pass: u64 },
    Serving { pass: u64, duration_ms: u64 },
    Failed { pass: u64, error: String },
}

impl BuildStatus {
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Push event sent to connected browsers.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DevEvent {
    Reload,
    Error { message: String },
}

impl DevEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"type\":\"reload\"}".to_string())
    }
}

pub struct DevState {
    snapshot: RwLock<Option<Arc<ServeSnapshot>>>,
    status: RwLock<BuildStatus>,
    events: broadcast::Sender<String>,
}

impl Default for DevState {
    fn default() -> Self {
        Self::new()
    }
}

impl DevState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            snapshot: RwLock::new(None),
            status: RwLock::new(BuildStatus::Idle),
            events,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<ServeSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Swap in a newer snapshot. Returns false (and drops the snapshot)
    /// when a pass with a higher number already landed.
    pub fn install_snapshot(&self, snapshot: ServeSnapshot) -> bool {
        let mut current = self.snapshot.write();
        if let Some(existing) = current.as_ref() {
            if existing.pass >= snapshot.pass {
                tracing::debug!(
                    stale = snapshot.pass,
                    current = existing.pass,
                    "discarding stale snapshot"
                );
                return false;
            }
        }
        *current = Some(Arc::new(snapshot));
        true
    }

    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    pub fn set_status(&self, status: BuildStatus) {
        *self.status.write() = status;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Broadcast to connected clients; a send with no receivers is fine.
    pub fn notify(&self, event: DevEvent) {
        let _ = self.events.send(event.to_json());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pass: u64) -> ServeSnapshot {
        ServeSnapshot {
            pass,
            files: IndexMap::new(),
            shell: format!("<html>{pass}</html>"),
        }
    }

    #[test]
    fn newer_snapshot_replaces_older() {
        let state = DevState::new();
        assert!(state.install_snapshot(snapshot(1)));
        assert!(state.install_snapshot(snapshot(2)));
        assert_eq!(state.snapshot().unwrap().pass, 2);
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let state = DevState::new();
        assert!(state.install_snapshot(snapshot(5)));
        assert!(!state.install_snapshot(snapshot(3)));
        assert!(!state.install_snapshot(snapshot(5)));
        assert_eq!(state.snapshot().unwrap().pass, 5);
    }

    #[test]
    fn events_reach_subscribers() {
        let state = DevState::new();
        let mut rx = state.subscribe();
        state.notify(DevEvent::Reload);
        assert_eq!(rx.try_recv().unwrap(), "{\"type\":\"reload\"}");

        state.notify(DevEvent::Error {
            message: "boom".into(),
        });
        assert!(rx.try_recv().unwrap().contains("boom"));
    }

    #[test]
    fn failed_status_exposes_error() {
        let state = DevState::new();
        state.set_status(BuildStatus::Failed {
            pass: 1,
            error: "compile error".into(),
        });
        assert_eq!(state.status().error(), Some("compile error"));
    }
}
