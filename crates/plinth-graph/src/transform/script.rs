//! Script chains: typed sources go through the external checker and
//! transpiler; plain scripts pass through unchanged.

use std::path::Path;

use crate::category::FileCategory;
use crate::error::{GraphError, Result};

use super::{parse_position, scan_deps, ChainSet, ModuleBody, TransformOutput};

/// Typed-script chain: type-check and transpile. Type errors abort the
/// pass when strict, and are demoted to warnings otherwise (the
/// permissive mode used during incremental development).
pub(super) fn transform_typed(chains: &ChainSet, path: &Path, source: &str) -> Result<TransformOutput> {
    let deps = scan_deps(FileCategory::TypedScript, source);

    let outcome = chains.runner().run(&chains.tools().typescript, &[], path)?;

    if !outcome.success {
        let message = if outcome.stderr.trim().is_empty() {
            outcome.stdout.trim().to_string()
        } else {
            outcome.stderr.trim().to_string()
        };
        if chains.strict_types() {
            let (line, column) = parse_position(&message);
            return Err(GraphError::Compile {
                path: path.to_path_buf(),
                line,
                column,
                message,
            });
        }
        tracing::warn!(path = %path.display(), "type check failed (permissive mode): {message}");
    }

    // Prefer the transpiled output; fall back to the source when the
    // checker produced diagnostics but no code.
    let code = if outcome.stdout.trim().is_empty() {
        source.to_string()
    } else {
        outcome.stdout
    };

    Ok(TransformOutput {
        body: ModuleBody::Script(code),
        deps,
    })
}

/// Plain-script chain: no tool step, just dependency discovery.
pub(super) fn transform_plain(path: &Path, source: &str) -> Result<TransformOutput> {
    let _ = path;
    Ok(TransformOutput {
        body: ModuleBody::Script(source.to_string()),
        deps: scan_deps(FileCategory::Script, source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{ToolOutcome, ToolRunner};
    use plinth_config::{Mode, PlinthConfig, ToolCommand};
    use std::path::PathBuf;

    struct Canned(ToolOutcome);

    impl ToolRunner for Canned {
        fn run(&self, _: &ToolCommand, _: &[String], _: &Path) -> Result<ToolOutcome> {
            Ok(self.0.clone())
        }
    }

    fn chains(mode: Mode, outcome: ToolOutcome) -> ChainSet {
        let mut config = PlinthConfig::default();
        config.mode = mode;
        ChainSet::new(&config, &PathBuf::from("/project"), Box::new(Canned(outcome)))
    }

    fn type_error() -> ToolOutcome {
        ToolOutcome {
            success: false,
            stdout: String::new(),
            stderr: "app.ts:3:7 - error TS2322: Type 'string' is not assignable".to_string(),
        }
    }

    #[test]
    fn type_errors_are_fatal_in_production() {
        let chains = chains(Mode::Production, type_error());
        let err = chains
            .transform(Path::new("src/app.ts"), FileCategory::TypedScript, b"let x: number = 'a';")
            .unwrap_err();
        match err {
            GraphError::Compile { message, line, .. } => {
                assert!(message.contains("TS2322"));
                assert_eq!(line, Some(3));
            }
            other => panic!("expected compile error, got {other}"),
        }
    }

    #[test]
    fn type_errors_demote_to_warnings_in_development() {
        let chains = chains(Mode::Development, type_error());
        let out = chains
            .transform(Path::new("src/app.ts"), FileCategory::TypedScript, b"let x: number = 'a';")
            .unwrap();
        assert!(matches!(out.body, ModuleBody::Script(_)));
    }

    #[test]
    fn plain_script_passes_through_with_deps() {
        let source = "import app from \"./src/app\";\napp();\n";
        let out = transform_plain(Path::new("entry.js"), source).unwrap();
        assert_eq!(out.deps, vec!["./src/app"]);
        assert_eq!(out.body, ModuleBody::Script(source.to_string()));
    }
}
