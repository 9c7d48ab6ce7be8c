//! # plinth-graph
//!
//! The build pipeline: resolve modules from an entry file, run each one
//! through its category's transformation chain, assemble the verified
//! dependency graph, and emit content-hashed artifacts plus the HTML
//! shell.
//!
//! The pieces compose left to right:
//!
//! ```text
//! Resolver ──▶ ChainSet ──▶ GraphBuilder ──▶ DependencyGraph ──▶ Emitter
//! ```
//!
//! Everything up to the emitter is deterministic: identical inputs and
//! configuration produce an identical graph and identical artifact
//! names, which is what makes both unit caching and cache-busting work.

pub mod builder;
pub mod category;
pub mod emit;
pub mod error;
pub mod graph;
pub mod hash;
pub mod resolver;
pub mod runtime;
pub mod scan;
pub mod transform;

pub use builder::GraphBuilder;
pub use category::{content_type, FileCategory};
pub use emit::{write_to, Artifacts, Emitter};
pub use error::{GraphError, Result};
pub use graph::{CompiledUnit, DependencyGraph, Edge};
pub use hash::{content_hash, hashed_name};
pub use resolver::Resolver;
pub use transform::{ChainSet, ModuleBody, ProcessRunner, ToolOutcome, ToolRunner, TransformOutput};
