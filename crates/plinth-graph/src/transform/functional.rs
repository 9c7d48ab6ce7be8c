//! Functional-language chain: external compiler, then a bundler-native
//! module wrapping the compiled code behind a default export.

use std::path::Path;

use crate::category::FileCategory;
use crate::error::{GraphError, Result};

use super::{parse_position, scan_deps, ChainSet, ModuleBody, TransformOutput};

pub(super) fn transform(chains: &ChainSet, path: &Path, source: &str) -> Result<TransformOutput> {
    // Imports are module names; the resolver maps them to files under the
    // configured search roots.
    let deps = scan_deps(FileCategory::Functional, source);

    // The compiler receives the source search directories so it can find
    // the modules this file imports.
    let mut extra_args = Vec::with_capacity(chains.source_dirs().len());
    for dir in chains.source_dirs() {
        extra_args.push(dir.display().to_string());
    }

    let outcome = chains
        .runner()
        .run(&chains.tools().functional, &extra_args, path)?;

    if !outcome.success {
        // Surface the compiler's own diagnostic text, never a summary.
        let message = if outcome.stderr.trim().is_empty() {
            outcome.stdout.trim().to_string()
        } else {
            outcome.stderr.trim().to_string()
        };
        let (line, column) = parse_position(&message);
        return Err(GraphError::Compile {
            path: path.to_path_buf(),
            line,
            column,
            message,
        });
    }

    // The compiled output evaluates to the module value; expose it as the
    // default export of a bundler-native module.
    let code = format!(
        "exports.default = (function () {{\n{}\n}})();\n",
        outcome.stdout.trim_end()
    );

    Ok(TransformOutput {
        body: ModuleBody::Script(code),
        deps,
    })
}
