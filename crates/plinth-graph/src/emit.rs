//! Artifact emission.
//!
//! Turns a verified graph into the output set: one content-hashed JS
//! bundle, one content-hashed stylesheet (when any CSS was extracted),
//! hashed binary assets under `assets/`, and the rendered HTML shell
//! that ties them together. Emission is split in two: [`Emitter::emit`]
//! produces everything in memory (the dev server serves straight from
//! this), and [`write_to`] persists an artifact set atomically.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use minijinja::{context, Environment};
use path_clean::PathClean;
use plinth_config::{HtmlOptions, Mode, PlinthConfig};
use regex::Regex;

use crate::error::{GraphError, Result};
use crate::graph::{CompiledUnit, DependencyGraph};
use crate::hash::content_hash;
use crate::runtime;
use crate::transform::ModuleBody;

const DEFAULT_SHELL: &str = include_str!("../assets/shell.html");

/// Everything one pass produces, keyed by served path.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// Rendered HTML shell, also present in `files` as `index.html`.
    pub shell: String,
    pub bundle_name: String,
    pub stylesheet_name: Option<String>,
    pub files: IndexMap<String, Vec<u8>>,
}

pub struct Emitter {
    mode: Mode,
    html: HtmlOptions,
    template: String,
    favicon: Option<(String, Vec<u8>)>,
    project_root: PathBuf,
}

impl Emitter {
    pub fn new(config: &PlinthConfig, project_root: &Path) -> Result<Self> {
        let template = match &config.html.template {
            Some(path) => fs::read_to_string(project_root.join(path))?,
            None => DEFAULT_SHELL.to_string(),
        };
        let favicon = match &config.html.favicon {
            Some(path) => {
                let path = project_root.join(path);
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("favicon.ico")
                    .to_string();
                Some((name, fs::read(&path)?))
            }
            None => None,
        };
        Ok(Self {
            mode: config.mode,
            html: config.html.clone(),
            template,
            favicon,
            project_root: project_root.to_path_buf(),
        })
    }

    /// Produce the full artifact set for a verified graph.
    pub fn emit(&self, graph: &DependencyGraph) -> Result<Artifacts> {
        let order = graph.topo_order();
        let mut files: IndexMap<String, Vec<u8>> = IndexMap::new();

        // Binary assets first so stylesheet url() rewriting can look up
        // their hashed names.
        for unit in &order {
            if let ModuleBody::Asset { file_name, bytes } = &unit.body {
                files.insert(format!("assets/{file_name}"), bytes.clone());
            }
        }

        let stylesheet_name = self.emit_stylesheet(graph, &order, &mut files);
        let bundle_name = self.emit_bundle(graph, &order, &mut files);

        if let Some((name, bytes)) = &self.favicon {
            files.insert(name.clone(), bytes.clone());
        }

        let shell = self.render_shell(&bundle_name, stylesheet_name.as_deref())?;
        files.insert("index.html".to_string(), shell.clone().into_bytes());

        tracing::debug!(files = files.len(), bundle = %bundle_name, "artifacts emitted");

        Ok(Artifacts {
            shell,
            bundle_name,
            stylesheet_name,
            files,
        })
    }

    fn emit_bundle(
        &self,
        graph: &DependencyGraph,
        order: &[&CompiledUnit],
        files: &mut IndexMap<String, Vec<u8>>,
    ) -> String {
        let mut bundle = String::from(runtime::PRELUDE);

        for unit in order {
            let id = self.unit_id(unit);
            let deps: IndexMap<&str, String> = unit
                .deps
                .iter()
                .map(|edge| {
                    let target = graph.get(&edge.target).map(|t| self.unit_id(t));
                    (edge.specifier.as_str(), target.unwrap_or_default())
                })
                .collect();
            let deps_json = serde_json::to_string(&deps).unwrap_or_else(|_| "{}".to_string());

            let body = match &unit.body {
                ModuleBody::Script(code) => runtime::rewrite_module(code),
                // The stylesheet text itself ships in the CSS artifact;
                // the module exists so script imports of it resolve.
                ModuleBody::Stylesheet(_) => String::new(),
                ModuleBody::Asset { file_name, .. } => {
                    format!(
                        "exports.default = {};",
                        runtime::js_string(&format!("assets/{file_name}"))
                    )
                }
            };
            // Development wraps each body in eval with a sourceURL
            // annotation so devtools map frames to module ids;
            // production emits plain factories.
            let define = if self.mode.is_production() {
                runtime::define_module(&id, &deps_json, &body)
            } else {
                runtime::define_module_eval(&id, &deps_json, &body)
            };
            bundle.push_str(&define);
        }

        let entry_id = graph
            .get(graph.entry())
            .map(|unit| self.unit_id(unit))
            .unwrap_or_default();
        bundle.push_str(&runtime::boot(&entry_id));

        let name = format!("app.{}.js", content_hash(bundle.as_bytes()));
        files.insert(name.clone(), bundle.into_bytes());
        name
    }

    fn emit_stylesheet(
        &self,
        graph: &DependencyGraph,
        order: &[&CompiledUnit],
        files: &mut IndexMap<String, Vec<u8>>,
    ) -> Option<String> {
        let mut css = String::new();
        for unit in order {
            if let ModuleBody::Stylesheet(text) = &unit.body {
                css.push_str(&rewrite_asset_urls(text, unit, graph));
                if !css.ends_with('\n') {
                    css.push('\n');
                }
            }
        }
        if css.is_empty() {
            return None;
        }
        let name = format!("style.{}.css", content_hash(css.as_bytes()));
        files.insert(name.clone(), css.into_bytes());
        Some(name)
    }

    fn render_shell(&self, bundle: &str, stylesheet: Option<&str>) -> Result<String> {
        let mut env = Environment::new();
        env.add_template("shell.html", &self.template)?;

        let google = self.html.analytics.google.for_mode(self.mode);
        let segment = self.html.analytics.segment.for_mode(self.mode);
        let languages =
            serde_json::to_string(&self.html.editor.languages).unwrap_or_else(|_| "[]".into());

        let shell = env.get_template("shell.html")?.render(context! {
            title => self.html.title,
            product_name => self.html.product_name,
            bundle => bundle,
            stylesheet => stylesheet,
            favicon => self.favicon.as_ref().map(|(name, _)| name.as_str()),
            google_analytics_id => non_empty(google),
            segment_id => non_empty(segment),
            editor_languages => minijinja::Value::from_safe_string(languages),
            mode => self.mode.to_string(),
        })?;
        Ok(shell)
    }

    /// Stable module id: project-relative path with forward slashes.
    fn unit_id(&self, unit: &CompiledUnit) -> String {
        let relative = unit
            .path
            .strip_prefix(&self.project_root)
            .unwrap_or(&unit.path);
        relative.display().to_string().replace('\\', "/")
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Point url() references at the hashed asset names. The stylesheet sits
/// at the output root, so `assets/<name>` is the correct relative path.
fn rewrite_asset_urls(css: &str, unit: &CompiledUnit, graph: &DependencyGraph) -> String {
    let mut out = css.to_string();
    for edge in &unit.deps {
        let Some(target) = graph.get(&edge.target) else {
            continue;
        };
        let ModuleBody::Asset { file_name, .. } = &target.body else {
            continue;
        };
        let pattern = Regex::new(&format!(
            r#"url\(\s*["']?{}["']?\s*\)"#,
            regex::escape(&edge.specifier)
        ));
        if let Ok(pattern) = pattern {
            out = pattern
                .replace_all(&out, format!("url(assets/{file_name})"))
                .into_owned();
        }
    }
    out
}

/// Persist an artifact set under `dir` with atomic all-or-nothing
/// semantics: every file is staged as a temp file first, then the whole
/// set is renamed into place. Any failure deletes everything staged or
/// renamed by this call.
pub fn write_to(artifacts: &Artifacts, dir: &Path) -> Result<()> {
    let dir = dir.to_path_buf().clean();
    fs::create_dir_all(&dir)?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();

    for (name, bytes) in &artifacts.files {
        let result = validate_output_path(&dir, name).and_then(|target| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let temp = target.with_extension("tmp");
            // Same single retry as the rename below; staging shares its
            // exposure to transient contention on the output directory.
            fs::write(&temp, bytes).or_else(|_| fs::write(&temp, bytes))?;
            Ok((temp, target))
        });
        match result {
            Ok(pair) => staged.push(pair),
            Err(error) => {
                cleanup(&staged);
                return Err(error);
            }
        }
    }

    let mut renamed: Vec<PathBuf> = Vec::new();
    for (temp, target) in &staged {
        // One retry; transient contention on the target is the only
        // rename failure seen in practice.
        let result = fs::rename(temp, target).or_else(|_| fs::rename(temp, target));
        if let Err(error) = result {
            for path in &renamed {
                let _ = fs::remove_file(path);
            }
            cleanup(&staged);
            return Err(GraphError::Emit(format!(
                "failed to move {} into place: {error}",
                target.display()
            )));
        }
        renamed.push(target.clone());
    }

    Ok(())
}

fn cleanup(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

/// Reject served names that would land outside the output directory.
fn validate_output_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.contains('\0') || Path::new(name).is_absolute() {
        return Err(GraphError::Emit(format!("invalid output name: {name:?}")));
    }
    let full = dir.join(Path::new(name).clean()).clean();
    if !full.starts_with(dir) {
        return Err(GraphError::Emit(format!(
            "output name '{name}' escapes the output directory"
        )));
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::FileCategory;
    use crate::graph::Edge;
    use tempfile::TempDir;

    fn script_unit(path: &str, code: &str, deps: &[(&str, &str)]) -> CompiledUnit {
        CompiledUnit {
            path: PathBuf::from(path),
            category: FileCategory::Script,
            body: ModuleBody::Script(code.to_string()),
            deps: deps
                .iter()
                .map(|(s, t)| Edge {
                    specifier: s.to_string(),
                    target: PathBuf::from(t),
                })
                .collect(),
            fingerprint: "f".into(),
        }
    }

    fn fixture_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new(PathBuf::from("/p/entry.js"));
        graph.insert(script_unit(
            "/p/entry.js",
            "import app from \"./src/app\";\nimport \"./style/main.css\";\napp();",
            &[
                ("./src/app", "/p/src/app.js"),
                ("./style/main.css", "/p/style/main.css"),
            ],
        ));
        graph.insert(script_unit("/p/src/app.js", "export default function () {};", &[]));
        graph.insert(CompiledUnit {
            path: PathBuf::from("/p/style/main.css"),
            category: FileCategory::Stylesheet,
            body: ModuleBody::Stylesheet(
                ".logo { background: url(\"../static/logo.png\"); }".into(),
            ),
            deps: vec![Edge {
                specifier: "../static/logo.png".into(),
                target: PathBuf::from("/p/static/logo.png"),
            }],
            fingerprint: "f".into(),
        });
        graph.insert(CompiledUnit {
            path: PathBuf::from("/p/static/logo.png"),
            category: FileCategory::Asset,
            body: ModuleBody::Asset {
                file_name: "logo.abcd1234.png".into(),
                bytes: vec![1, 2, 3],
            },
            deps: vec![],
            fingerprint: "f".into(),
        });
        graph
    }

    fn emitter() -> Emitter {
        Emitter::new(&PlinthConfig::default(), Path::new("/p")).unwrap()
    }

    #[test]
    fn emits_hashed_bundle_stylesheet_and_assets() {
        let artifacts = emitter().emit(&fixture_graph()).unwrap();

        assert!(artifacts.bundle_name.starts_with("app."));
        assert!(artifacts.bundle_name.ends_with(".js"));
        let stylesheet = artifacts.stylesheet_name.as_deref().unwrap();
        assert!(stylesheet.starts_with("style."));

        assert!(artifacts.files.contains_key(&artifacts.bundle_name));
        assert!(artifacts.files.contains_key(stylesheet));
        assert!(artifacts.files.contains_key("assets/logo.abcd1234.png"));
        assert!(artifacts.files.contains_key("index.html"));
    }

    #[test]
    fn bundle_contains_registry_and_entry_boot() {
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        let bundle =
            String::from_utf8(artifacts.files[&artifacts.bundle_name].clone()).unwrap();
        assert!(bundle.contains("__plinth.define(\"entry.js\""));
        assert!(bundle.contains("__plinth.require(\"entry.js\");"));
        // Dependency map carries resolved ids under the source specifier.
        assert!(bundle.contains("\"./src/app\":\"src/app.js\""));
        assert!(!bundle.contains("import app"));
    }

    #[test]
    fn stylesheet_urls_point_at_hashed_assets() {
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        let name = artifacts.stylesheet_name.as_deref().unwrap();
        let css = String::from_utf8(artifacts.files[name].clone()).unwrap();
        assert!(css.contains("url(assets/logo.abcd1234.png)"));
        assert!(!css.contains("../static/logo.png"));
    }

    #[test]
    fn shell_references_emitted_artifacts() {
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        assert!(artifacts.shell.contains(&artifacts.bundle_name));
        assert!(artifacts
            .shell
            .contains(artifacts.stylesheet_name.as_deref().unwrap()));
        assert!(artifacts.shell.contains("window.editorLanguages = [\"haskell\"];"));
        assert!(artifacts.shell.contains("<title>Playground</title>"));
    }

    #[test]
    fn bundle_hash_is_stable_and_content_addressed() {
        let first = emitter().emit(&fixture_graph()).unwrap();
        let second = emitter().emit(&fixture_graph()).unwrap();
        assert_eq!(first.bundle_name, second.bundle_name);

        let mut graph = fixture_graph();
        graph.insert(script_unit("/p/src/app.js", "export default function () { return 1; };", &[]));
        let third = emitter().emit(&graph).unwrap();
        assert_ne!(first.bundle_name, third.bundle_name);
    }

    #[test]
    fn graph_without_stylesheets_emits_none() {
        let mut graph = DependencyGraph::new(PathBuf::from("/p/entry.js"));
        graph.insert(script_unit("/p/entry.js", "1;", &[]));
        let artifacts = emitter().emit(&graph).unwrap();
        assert!(artifacts.stylesheet_name.is_none());
        assert!(!artifacts.shell.contains("stylesheet"));
    }

    #[test]
    fn development_bundles_annotate_modules_for_devtools() {
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        let bundle =
            String::from_utf8(artifacts.files[&artifacts.bundle_name].clone()).unwrap();
        assert!(bundle.contains("eval("));
        assert!(bundle.contains("sourceURL=plinth:///src/app.js"));
    }

    #[test]
    fn production_bundles_ship_plain_factories() {
        let mut config = PlinthConfig::default();
        config.mode = Mode::Production;
        let emitter = Emitter::new(&config, Path::new("/p")).unwrap();

        let artifacts = emitter.emit(&fixture_graph()).unwrap();
        let bundle =
            String::from_utf8(artifacts.files[&artifacts.bundle_name].clone()).unwrap();
        assert!(!bundle.contains("eval("));
        assert!(!bundle.contains("sourceURL="));
        assert!(bundle.contains("exports.default = function () {};"));
    }

    #[test]
    fn write_is_atomic_and_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        write_to(&artifacts, dir.path()).unwrap();
        assert!(dir.path().join("index.html").is_file());
        assert!(dir.path().join("assets/logo.abcd1234.png").is_file());
        // No stray temp files once the set is in place.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let mut evil = Artifacts::default();
        evil.files.insert("../escape.txt".into(), vec![1]);
        assert!(write_to(&evil, dir.path()).is_err());
    }

    #[test]
    fn writing_over_an_existing_output_set_succeeds() {
        // Staging and rename both run against already-present targets.
        let dir = TempDir::new().unwrap();
        let artifacts = emitter().emit(&fixture_graph()).unwrap();
        write_to(&artifacts, dir.path()).unwrap();
        write_to(&artifacts, dir.path()).unwrap();
        assert!(dir.path().join("index.html").is_file());
        assert!(dir.path().join(&artifacts.bundle_name).is_file());
    }
}
