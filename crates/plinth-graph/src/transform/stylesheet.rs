//! Stylesheet chains.
//!
//! `.scss` files are expanded by the external preprocessor (nested rules,
//! variables, `@use` inlining) and then printed through lightningcss.
//! Plain `.css` files skip the preprocessor step entirely. All CSS
//! produced in a pass is extracted out of the JS bundle and concatenated
//! by the emitter.

use std::path::Path;

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::category::FileCategory;
use crate::error::{GraphError, Result};

use super::{parse_position, scan_deps, ChainSet, ModuleBody, TransformOutput};

pub(super) fn transform_preprocessed(
    chains: &ChainSet,
    path: &Path,
    _source: &str,
) -> Result<TransformOutput> {
    // The preprocessor inlines @use/@import itself, so only url() asset
    // references become graph edges here. The design-token table is an
    // opaque include path; its contents are the preprocessor's business.
    let mut extra_args = Vec::new();
    if let Some(table) = chains.token_table() {
        if let Some(dir) = table.parent() {
            extra_args.push("--load-path".to_string());
            extra_args.push(dir.display().to_string());
        }
    }

    let outcome = chains.runner().run(&chains.tools().sass, &extra_args, path)?;
    if !outcome.success {
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

    let deps = asset_urls(&outcome.stdout);
    let css = print_css(chains, path, &outcome.stdout)?;

    Ok(TransformOutput {
        body: ModuleBody::Stylesheet(css),
        deps,
    })
}

pub(super) fn transform_css(chains: &ChainSet, path: &Path, source: &str) -> Result<TransformOutput> {
    let deps = scan_deps(FileCategory::Stylesheet, source);

    // Local @import targets become graph edges and are concatenated by
    // the emitter, so the statements themselves must not survive into
    // the extracted stylesheet.
    let stripped = strip_local_imports(source, &deps);
    let css = print_css(chains, path, &stripped)?;

    Ok(TransformOutput {
        body: ModuleBody::Stylesheet(css),
        deps,
    })
}

/// Parse, optionally minify, and reprint CSS text.
fn print_css(chains: &ChainSet, path: &Path, css: &str) -> Result<String> {
    let minify = chains.mode().is_production();

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: path.display().to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| GraphError::Compile {
        path: path.to_path_buf(),
        line: None,
        column: None,
        message: format!("CSS parse error: {e}"),
    })?;

    if minify {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| GraphError::Compile {
                path: path.to_path_buf(),
                line: None,
                column: None,
                message: format!("CSS minify error: {e:?}"),
            })?;
    }

    let output = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..Default::default()
        })
        .map_err(|e| GraphError::Compile {
            path: path.to_path_buf(),
            line: None,
            column: None,
            message: format!("CSS print error: {e:?}"),
        })?;

    Ok(output.code)
}

static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@(?:import|use)\s+(?:url\(\s*)?["']([^"']+)["']\)?[^;]*;\s*"#)
        .expect("import statement pattern")
});

static URL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*["']?([^"')]+)["']?\s*\)"#).expect("url pattern"));

fn strip_local_imports(css: &str, deps: &[String]) -> String {
    IMPORT_STATEMENT
        .replace_all(css, |captures: &regex::Captures<'_>| {
            if deps.iter().any(|dep| dep == &captures[1]) {
                String::new()
            } else {
                captures[0].to_string()
            }
        })
        .into_owned()
}

fn asset_urls(css: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for capture in URL_REF.captures_iter(css) {
        let url = capture[1].trim();
        if !url.starts_with("http") && !url.starts_with("data:") && !url.starts_with('#') {
            urls.push(url.to_string());
        }
    }
    urls.dedup();
    urls
}
