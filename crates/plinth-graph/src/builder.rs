//! Graph construction.
//!
//! Starts from the entry module and walks outward in parallel waves: every
//! path in the current frontier is read, transformed, and resolved
//! concurrently, then the newly discovered targets form the next frontier.
//! A concurrent visited set guarantees each file is compiled at most once
//! per pass regardless of how many importers reach it.
//!
//! The builder also owns the unit cache that makes incremental passes
//! cheap: a unit whose input bytes hash to the same fingerprint as last
//! pass is reused without re-running its chain, unless an invalidation
//! explicitly evicted it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use path_clean::PathClean;
use plinth_config::PlinthConfig;
use rayon::prelude::*;

use crate::category::FileCategory;
use crate::error::Result;
use crate::graph::{CompiledUnit, DependencyGraph, Edge};
use crate::hash::content_hash;
use crate::resolver::Resolver;
use crate::transform::{ChainSet, ToolRunner};

pub struct GraphBuilder {
    entry: PathBuf,
    resolver: Resolver,
    chains: ChainSet,
    /// Units from the last successful pass, keyed by path. Reused when the
    /// file's fingerprint is unchanged and nothing evicted the entry.
    cache: HashMap<PathBuf, CompiledUnit>,
}

impl GraphBuilder {
    pub fn new(config: &PlinthConfig, project_root: &Path, runner: Box<dyn ToolRunner>) -> Self {
        let entry = project_root.join(&config.entry).clean();
        Self {
            entry,
            resolver: Resolver::new(project_root, config.resolve.clone()),
            chains: ChainSet::new(config, project_root, runner),
            cache: HashMap::new(),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Run one full pass: transform every reachable file and assemble the
    /// verified graph. A failure anywhere aborts the pass; the cache keeps
    /// the units that did succeed on earlier passes.
    pub fn build(&mut self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new(self.entry.clone());
        let visited: DashMap<PathBuf, ()> = DashMap::new();
        visited.insert(self.entry.clone(), ());

        let mut frontier = vec![self.entry.clone()];
        let mut reused = 0usize;

        while !frontier.is_empty() {
            let wave: Vec<Result<(CompiledUnit, bool)>> = frontier
                .par_iter()
                .map(|path| self.compile(path))
                .collect();

            let mut next = Vec::new();
            for result in wave {
                let (unit, from_cache) = result?;
                if from_cache {
                    reused += 1;
                }
                for edge in &unit.deps {
                    if visited.insert(edge.target.clone(), ()).is_none() {
                        next.push(edge.target.clone());
                    }
                }
                graph.insert(unit);
            }
            frontier = next;
        }

        graph.verify()?;

        tracing::debug!(
            units = graph.len(),
            reused,
            "graph pass complete"
        );

        // The verified pass becomes the cache for the next one.
        self.cache = graph.units().map(|u| (u.path.clone(), u.clone())).collect();

        Ok(graph)
    }

    /// Evict everything a set of changed files can influence.
    ///
    /// The changed files themselves, their full reverse dependency
    /// closure, and, when a preprocessed stylesheet changed, every
    /// preprocessed unit: the preprocessor inlines its partials, so those
    /// inclusion edges are invisible to the graph.
    pub fn invalidate(&mut self, changed: &[PathBuf]) {
        let mut evict: HashSet<PathBuf> = changed.iter().map(|p| p.clean()).collect();

        loop {
            let mut grew = false;
            for unit in self.cache.values() {
                if evict.contains(&unit.path) {
                    continue;
                }
                if unit.deps.iter().any(|edge| evict.contains(&edge.target)) {
                    evict.insert(unit.path.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let scss_changed = changed
            .iter()
            .any(|p| FileCategory::from_path(p) == Some(FileCategory::Preprocessed));
        if scss_changed {
            evict.extend(
                self.cache
                    .values()
                    .filter(|u| u.category == FileCategory::Preprocessed)
                    .map(|u| u.path.clone()),
            );
        }

        let before = self.cache.len();
        self.cache.retain(|path, _| !evict.contains(path));
        tracing::debug!(evicted = before - self.cache.len(), "cache invalidated");
    }

    fn compile(&self, path: &Path) -> Result<(CompiledUnit, bool)> {
        let bytes = fs::read(path)?;
        let fingerprint = content_hash(&bytes);

        if let Some(cached) = self.cache.get(path) {
            if cached.fingerprint == fingerprint {
                return Ok((cached.clone(), true));
            }
        }

        // Files reached through the graph with an unrecognized extension
        // are treated as opaque assets.
        let category = FileCategory::from_path(path).unwrap_or(FileCategory::Asset);
        let output = self.chains.transform(path, category, &bytes)?;

        let mut deps = Vec::with_capacity(output.deps.len());
        for specifier in output.deps {
            let target = self.resolver.resolve(&specifier, path)?;
            deps.push(Edge { specifier, target });
        }

        Ok((
            CompiledUnit {
                path: path.to_path_buf(),
                category,
                body: output.body,
                deps,
                fingerprint,
            },
            false,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ToolOutcome, ToolRunner};
    use plinth_config::ToolCommand;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Stub runner that counts invocations per tool command.
    struct Counting {
        runs: Arc<AtomicUsize>,
    }

    impl ToolRunner for Counting {
        fn run(&self, tool: &ToolCommand, _: &[String], _: &Path) -> Result<ToolOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let stdout = if tool.command == "sass" {
                ".stub { color: red; }".to_string()
            } else {
                "return {};".to_string()
            };
            Ok(ToolOutcome {
                success: true,
                stdout,
                stderr: String::new(),
            })
        }
    }

    fn builder(root: &Path, runs: Arc<AtomicUsize>) -> GraphBuilder {
        let config = PlinthConfig::default();
        GraphBuilder::new(&config, root, Box::new(Counting { runs }))
    }

    fn script_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("entry.js"),
            "import a from \"./src/a\";\nimport b from \"./src/b\";\n",
        )
        .unwrap();
        fs::write(root.join("src/a.js"), "import s from \"./shared\";\n").unwrap();
        fs::write(root.join("src/b.js"), "import s from \"./shared\";\n").unwrap();
        fs::write(root.join("src/shared.js"), "export default 1;\n").unwrap();
        dir
    }

    #[test]
    fn shared_dependency_is_compiled_once() {
        let dir = script_project();
        let mut builder = builder(dir.path(), Arc::new(AtomicUsize::new(0)));
        let graph = builder.build().unwrap();
        assert_eq!(graph.len(), 4);
        assert!(graph.verify().is_ok());
    }

    #[test]
    fn unchanged_functional_units_skip_the_compiler_on_the_next_pass() {
        let dir = script_project();
        fs::write(dir.path().join("src/Mod.purs"), "module Mod where\n").unwrap();
        fs::write(
            dir.path().join("entry.js"),
            "import m from \"Mod\";\nimport a from \"./src/a\";\n",
        )
        .unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut builder = builder(dir.path(), runs.clone());

        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1, "cached unit must be reused");
    }

    #[test]
    fn invalidation_recompiles_the_reverse_closure_only() {
        let dir = script_project();
        fs::write(dir.path().join("src/Mod.purs"), "module Mod where\n").unwrap();
        fs::write(dir.path().join("src/Other.purs"), "module Other where\n").unwrap();
        fs::write(
            dir.path().join("entry.js"),
            "import m from \"Mod\";\nimport o from \"Other\";\n",
        )
        .unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut builder = builder(dir.path(), runs.clone());
        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        builder.invalidate(&[dir.path().join("src/Mod.purs")]);
        builder.build().unwrap();
        // Only the evicted unit re-runs its compiler.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn changed_file_recompiles_even_without_invalidation() {
        let dir = script_project();
        fs::write(dir.path().join("src/Mod.purs"), "module Mod where\n").unwrap();
        fs::write(dir.path().join("entry.js"), "import m from \"Mod\";\n").unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut builder = builder(dir.path(), runs.clone());
        builder.build().unwrap();

        fs::write(dir.path().join("src/Mod.purs"), "module Mod where\n-- v2\n").unwrap();
        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2, "fingerprint change forces recompile");
    }

    #[test]
    fn unresolvable_import_fails_the_pass() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("entry.js"), "import x from \"./missing\";\n").unwrap();
        let mut builder = builder(dir.path(), Arc::new(AtomicUsize::new(0)));
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains("./missing"));
    }

    #[test]
    fn scss_change_evicts_all_preprocessed_units() {
        let dir = script_project();
        let root = dir.path();
        fs::create_dir_all(root.join("static")).unwrap();
        fs::write(root.join("static/main.scss"), ".a { color: red; }").unwrap();
        fs::write(root.join("static/other.scss"), ".b { color: blue; }").unwrap();
        fs::write(
            root.join("entry.js"),
            "import \"./static/main.scss\";\nimport \"./static/other.scss\";\n",
        )
        .unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let mut builder = builder(root, runs.clone());
        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // A partial not in the graph changed; both sheets must re-run.
        builder.invalidate(&[root.join("static/_partial.scss")]);
        builder.build().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }
}
