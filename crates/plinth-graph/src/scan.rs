//! Dependency specifier extraction.
//!
//! Each chain reports the specifiers its module references so the graph
//! builder can resolve and enqueue them. Scanning is text-based and
//! deliberately conservative: it only recognizes the static import forms
//! the source languages actually use.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::category::FileCategory;

static SCRIPT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    // `import x from "m"`, `import "m"`, `export ... from "m"`, `require("m")`
    Regex::new(
        r#"(?m)(?:\bimport\s+(?:[\w*\s{},$]*\s+from\s+)?|\bexport\s+[\w*\s{},$]*\s+from\s+|\brequire\s*\(\s*)["']([^"']+)["']"#,
    )
    .expect("script import pattern")
});

static FUNCTIONAL_IMPORT: Lazy<Regex> = Lazy::new(|| {
    // `import Data.Maybe`, `import Marlowe.Semantics as S`
    Regex::new(r"(?m)^import\s+([A-Z][A-Za-z0-9_.]*)").expect("functional import pattern")
});

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    // `@import "m";`, `@use 'm';`, with optional url(...)
    Regex::new(r#"@(?:import|use)\s+(?:url\(\s*)?["']([^"']+)["']"#).expect("css import pattern")
});

static CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*["']?([^"')]+)["']?\s*\)"#).expect("css url pattern"));

/// Extract the dependency specifiers of a source file, in source order.
pub fn dependencies(category: FileCategory, source: &str) -> Vec<String> {
    let mut specifiers = Vec::new();
    match category {
        FileCategory::Script | FileCategory::TypedScript => {
            for capture in SCRIPT_IMPORT.captures_iter(source) {
                specifiers.push(capture[1].to_string());
            }
        }
        FileCategory::Functional => {
            for capture in FUNCTIONAL_IMPORT.captures_iter(source) {
                specifiers.push(capture[1].to_string());
            }
        }
        FileCategory::Preprocessed | FileCategory::Stylesheet => {
            for capture in CSS_IMPORT.captures_iter(source) {
                specifiers.push(capture[1].to_string());
            }
            for capture in CSS_URL.captures_iter(source) {
                let url = capture[1].trim();
                // External and data URLs are not graph edges.
                if !url.starts_with("http") && !url.starts_with("data:") && !url.starts_with('#') {
                    specifiers.push(url.to_string());
                }
            }
        }
        FileCategory::Asset => {}
    }
    specifiers.dedup();
    specifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_imports_all_static_forms() {
        let source = r#"
            import app from "./src/app";
            import "static/main.scss";
            export { thing } from './lib/thing';
            const legacy = require("./legacy");
        "#;
        let deps = dependencies(FileCategory::Script, source);
        assert_eq!(
            deps,
            vec!["./src/app", "static/main.scss", "./lib/thing", "./legacy"]
        );
    }

    #[test]
    fn functional_imports_are_module_names() {
        let source = "module Main where\n\nimport Prelude\nimport Marlowe.Semantics as S\n";
        let deps = dependencies(FileCategory::Functional, source);
        assert_eq!(deps, vec!["Prelude", "Marlowe.Semantics"]);
    }

    #[test]
    fn functional_scan_ignores_indented_words() {
        // `import` must start the line; a mention mid-expression is not an import.
        let source = "module A where\n  let important = 1\n";
        assert!(dependencies(FileCategory::Functional, source).is_empty());
    }

    #[test]
    fn css_imports_and_asset_urls() {
        let source = r#"
            @import "./base.css";
            @use 'variables';
            .logo { background: url("../static/logo.png"); }
            .ext { background: url(https://cdn.example.com/x.png); }
        "#;
        let deps = dependencies(FileCategory::Stylesheet, source);
        assert_eq!(deps, vec!["./base.css", "variables", "../static/logo.png"]);
    }

    #[test]
    fn assets_have_no_dependencies() {
        assert!(dependencies(FileCategory::Asset, "binary-ish").is_empty());
    }
}
