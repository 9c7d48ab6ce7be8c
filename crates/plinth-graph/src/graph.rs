//! The dependency graph produced by a build pass.
//!
//! Nodes are compiled units keyed by canonical absolute path; edges carry
//! the original specifier text alongside the resolved target so tooling
//! can report both. The graph is a pure data structure: the builder fills
//! it in, the emitter walks it, nothing here touches the filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::category::FileCategory;
use crate::error::{GraphError, Result};
use crate::transform::ModuleBody;

/// A resolved dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Specifier as written in the source file.
    pub specifier: String,
    /// Canonical absolute path of the target unit.
    pub target: PathBuf,
}

/// One fully transformed module.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub path: PathBuf,
    pub category: FileCategory,
    pub body: ModuleBody,
    pub deps: Vec<Edge>,
    /// Content hash of the raw input bytes; the unit-cache key.
    pub fingerprint: String,
}

/// Complete graph for one pass, rooted at the entry module.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    entry: PathBuf,
    units: IndexMap<PathBuf, CompiledUnit>,
}

impl DependencyGraph {
    pub fn new(entry: PathBuf) -> Self {
        Self {
            entry,
            units: IndexMap::new(),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn insert(&mut self, unit: CompiledUnit) {
        self.units.insert(unit.path.clone(), unit);
    }

    pub fn get(&self, path: &Path) -> Option<&CompiledUnit> {
        self.units.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.units.contains_key(path)
    }

    pub fn units(&self) -> impl Iterator<Item = &CompiledUnit> {
        self.units.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.units.keys()
    }

    /// Every unit that depends on `path`, directly or transitively.
    ///
    /// This is the invalidation set for a changed file: the file itself
    /// plus its full reverse closure must be recompiled, everything else
    /// keeps its cached unit.
    pub fn dependents_closure(&self, path: &Path) -> HashSet<PathBuf> {
        let mut closure: HashSet<PathBuf> = HashSet::new();
        closure.insert(path.to_path_buf());

        // Fixed point over direct reverse edges. Graphs are small enough
        // that the quadratic scan never shows up in practice.
        loop {
            let mut grew = false;
            for unit in self.units.values() {
                if closure.contains(&unit.path) {
                    continue;
                }
                if unit.deps.iter().any(|edge| closure.contains(&edge.target)) {
                    closure.insert(unit.path.clone());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        closure
    }

    /// Check the structural invariants: the entry is present and every
    /// edge points at a unit in the graph.
    pub fn verify(&self) -> Result<()> {
        if !self.units.contains_key(&self.entry) {
            return Err(GraphError::Resolution {
                specifier: self.entry.display().to_string(),
                importer: self.entry.clone(),
            });
        }
        for unit in self.units.values() {
            for edge in &unit.deps {
                if !self.units.contains_key(&edge.target) {
                    return Err(GraphError::Resolution {
                        specifier: edge.specifier.clone(),
                        importer: unit.path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Dependency-first ordering from the entry, cycle-safe.
    ///
    /// Iterative DFS post-order: a unit appears after all of its
    /// dependencies except those reached through a cycle back to an
    /// ancestor, which the visited set breaks. The result is
    /// deterministic because edges are kept in source order.
    pub fn topo_order(&self) -> Vec<&CompiledUnit> {
        enum Step<'a> {
            Enter(&'a Path),
            Exit(&'a Path),
        }

        let mut visited: HashSet<&Path> = HashSet::new();
        let mut order = Vec::with_capacity(self.units.len());
        let mut stack = vec![Step::Enter(self.entry.as_path())];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(path) => {
                    if !visited.insert(path) {
                        continue;
                    }
                    let Some(unit) = self.units.get(path) else {
                        continue;
                    };
                    stack.push(Step::Exit(path));
                    // Reverse so the first dependency is processed first.
                    for edge in unit.deps.iter().rev() {
                        if !visited.contains(edge.target.as_path()) {
                            stack.push(Step::Enter(edge.target.as_path()));
                        }
                    }
                }
                Step::Exit(path) => {
                    if let Some(unit) = self.units.get(path) {
                        order.push(unit);
                    }
                }
            }
        }
        order
    }
}
