//! Filesystem watcher for the dev loop.
//!
//! Wraps `notify`'s recursive watcher, filters out irrelevant paths
//! (build output, VCS noise, configured ignore patterns, files no chain
//! claims) and forwards the rest over a channel. Debouncing and batching
//! happen in the rebuild loop, which coalesces everything that arrives
//! within the configured window into one pass.

use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use plinth_graph::FileCategory;
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

pub struct FileWatcher {
    // Dropping the watcher stops the native watch, so it must live as
    // long as the dev session.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` recursively. Returns the watcher handle and the
    /// channel of relevant changed paths.
    pub fn new(root: &Path, ignore: Vec<String>) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        if !root.exists() {
            return Err(CliError::Watch(format!(
                "watch root does not exist: {}",
                root.display()
            )));
        }

        let (tx, rx) = mpsc::channel(256);
        let root_owned = root.to_path_buf();

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if !is_mutation(&event) {
                        return;
                    }
                    for path in &event.paths {
                        if is_relevant(path, &root_owned, &ignore) {
                            // Full channel means a rebuild is already
                            // overdue; dropping extra events is safe.
                            let _ = tx.try_send(path.clone());
                        }
                    }
                }
                Err(error) => tracing::warn!("watch error: {error}"),
            })
            .map_err(|e| CliError::Watch(e.to_string()))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| CliError::Watch(e.to_string()))?;

        tracing::debug!(root = %root.display(), "watching for changes");
        Ok((Self { _watcher: watcher }, rx))
    }
}

fn is_mutation(event: &Event) -> bool {
    event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()
}

/// A path matters when some chain claims it or it is the config file.
fn is_relevant(path: &Path, root: &Path, ignore: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);

    for component in relative.components() {
        let part = component.as_os_str().to_string_lossy();
        for pattern in ignore {
            if matches(&part, pattern) {
                return false;
            }
        }
    }

    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name == plinth_config::CONFIG_FILE || FileCategory::from_path(path).is_some()
}

/// Literal match, with a `*` prefix treated as a suffix wildcard. Covers
/// the patterns the ignore list actually uses (`node_modules`, `*.log`).
fn matches(part: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) => part.ends_with(suffix),
        None => part == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relevant(path: &str) -> bool {
        let ignore = plinth_config::DevOptions::default().watch_ignore;
        is_relevant(Path::new(path), Path::new("/project"), &ignore)
    }

    #[test]
    fn source_files_are_relevant() {
        assert!(relevant("/project/src/Main.purs"));
        assert!(relevant("/project/entry.js"));
        assert!(relevant("/project/static/main.scss"));
        assert!(relevant("/project/plinth.config.json"));
    }

    #[test]
    fn ignored_directories_are_filtered() {
        assert!(!relevant("/project/node_modules/dep/index.js"));
        assert!(!relevant("/project/dist/app.abc.js"));
        assert!(!relevant("/project/.git/HEAD"));
    }

    #[test]
    fn unclaimed_files_are_filtered() {
        assert!(!relevant("/project/README.md"));
        assert!(!relevant("/project/build.log"));
        assert!(!relevant("/project/notes.txt"));
    }

    #[test]
    fn wildcard_patterns_match_suffixes() {
        assert!(matches("debug.log", "*.log"));
        assert!(!matches("log.txt", "*.log"));
        assert!(matches("node_modules", "node_modules"));
    }
}
