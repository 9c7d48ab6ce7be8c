//! Bundle runtime and module codegen.
//!
//! Compiled script units are wrapped into a tiny in-bundle module
//! registry: each unit becomes a `define(id, deps, factory)` call where
//! `deps` maps the specifiers written in the source to the ids of their
//! resolved targets. Module exports are memoized before the factory runs,
//! which is what lets import cycles terminate.
//!
//! Import/export syntax is rewritten to registry calls with a small set
//! of line-anchored patterns. The sources this pipeline sees are either
//! compiler output or the thin entry glue, so the common forms are all
//! that occur in practice.

use once_cell::sync::Lazy;
use regex::Regex;

/// Registry prologue prepended to every bundle.
pub const PRELUDE: &str = r#"(function (global) {
  "use strict";
  var registry = {};
  var cache = {};
  function define(id, deps, factory) {
    registry[id] = { deps: deps, factory: factory };
  }
  function load(id) {
    var hit = cache[id];
    if (hit) return hit.exports;
    var entry = registry[id];
    if (!entry) throw new Error("unknown module: " + id);
    var module = { exports: {} };
    cache[id] = module;
    entry.factory(
      function (specifier) {
        var target = entry.deps[specifier];
        if (target === undefined) throw new Error("unresolved import '" + specifier + "' in " + id);
        return load(target);
      },
      module.exports,
      module
    );
    return module.exports;
  }
  function interop(mod) {
    return mod && mod.__esModule === undefined && mod.default !== undefined ? mod.default : mod;
  }
  global.__plinth = { define: define, require: load, interop: interop };
})(typeof window !== "undefined" ? window : globalThis);
"#;

/// Emit one `define` call for a module.
///
/// `deps_json` is the serialized specifier-to-id map; `body` is the
/// already rewritten module code.
pub fn define_module(id: &str, deps_json: &str, body: &str) -> String {
    format!(
        "__plinth.define({id}, {deps}, function (require, exports, module) {{\n{body}\n}});\n",
        id = js_string(id),
        deps = deps_json,
        body = body
    )
}

/// Emit one `define` call whose body runs under `eval` with a
/// `sourceURL` annotation. Browser devtools then attribute stack frames
/// and breakpoints to the module id instead of one opaque bundle file.
/// Development builds use this; production ships plain factories.
pub fn define_module_eval(id: &str, deps_json: &str, body: &str) -> String {
    let annotated = format!("{body}\n//# sourceURL=plinth:///{id}");
    format!(
        "__plinth.define({id}, {deps}, function (require, exports, module) {{\neval({code});\n}});\n",
        id = js_string(id),
        deps = deps_json,
        code = js_string(&annotated)
    )
}

/// Emit the bundle epilogue that kicks off the entry module.
pub fn boot(entry_id: &str) -> String {
    format!("__plinth.require({});\n", js_string(entry_id))
}

/// JSON-style string literal; ids are paths and may contain backslashes.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

static IMPORT_DEFAULT_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^\s*import\s+([A-Za-z_$][\w$]*)\s*,\s*\{([^}]*)\}\s*from\s*["']([^"']+)["']\s*;?"#,
    )
    .expect("import default+named pattern")
});

static IMPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+([A-Za-z_$][\w$]*)\s+from\s+["']([^"']+)["']\s*;?"#)
        .expect("import default pattern")
});

static IMPORT_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s*\{([^}]*)\}\s*from\s*["']([^"']+)["']\s*;?"#)
        .expect("import named pattern")
});

static IMPORT_STAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s*\*\s*as\s+([A-Za-z_$][\w$]*)\s+from\s+["']([^"']+)["']\s*;?"#)
        .expect("import star pattern")
});

static IMPORT_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+["']([^"']+)["']\s*;?"#).expect("bare import"));

static EXPORT_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s+default\s+").expect("export default"));

static EXPORT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+(const|let|var|function|class)\s+([A-Za-z_$][\w$]*)")
        .expect("export declaration")
});

static EXPORT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s*\{([^}]*)\}\s*;?").expect("export list"));

/// Rewrite module syntax into registry calls.
pub fn rewrite_module(source: &str) -> String {
    let mut code = source.to_string();

    code = IMPORT_DEFAULT_NAMED
        .replace_all(&code, |c: &regex::Captures<'_>| {
            let spec = js_string(&c[3]);
            format!(
                "var {0} = __plinth.interop(require({spec})); var {{{1}}} = require({spec});",
                &c[1],
                rename_bindings(&c[2]),
            )
        })
        .into_owned();

    code = IMPORT_STAR
        .replace_all(&code, |c: &regex::Captures<'_>| {
            format!("var {} = require({});", &c[1], js_string(&c[2]))
        })
        .into_owned();

    code = IMPORT_NAMED
        .replace_all(&code, |c: &regex::Captures<'_>| {
            format!(
                "var {{{}}} = require({});",
                rename_bindings(&c[1]),
                js_string(&c[2])
            )
        })
        .into_owned();

    code = IMPORT_DEFAULT
        .replace_all(&code, |c: &regex::Captures<'_>| {
            format!(
                "var {} = __plinth.interop(require({}));",
                &c[1],
                js_string(&c[2])
            )
        })
        .into_owned();

    code = IMPORT_BARE
        .replace_all(&code, |c: &regex::Captures<'_>| {
            format!("require({});", js_string(&c[1]))
        })
        .into_owned();

    code = EXPORT_DEFAULT.replace_all(&code, "exports.default = ").into_owned();

    // `export const x = …` keeps the declaration and appends the export
    // assignment at the end of the module, where the binding is complete.
    let mut trailing = Vec::new();
    code = EXPORT_DECL
        .replace_all(&code, |c: &regex::Captures<'_>| {
            trailing.push(format!("exports.{0} = {0};", &c[2]));
            format!("{} {}", &c[1], &c[2])
        })
        .into_owned();

    code = EXPORT_LIST
        .replace_all(&code, |c: &regex::Captures<'_>| {
            c[1].split(',')
                .filter_map(|binding| {
                    let binding = binding.trim();
                    if binding.is_empty() {
                        return None;
                    }
                    Some(match binding.split_once(" as ") {
                        Some((local, exported)) => {
                            format!("exports.{} = {};", exported.trim(), local.trim())
                        }
                        None => format!("exports.{0} = {0};", binding),
                    })
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .into_owned();

    if !trailing.is_empty() {
        code.push('\n');
        code.push_str(&trailing.join("\n"));
    }
    code
}

/// `a as b` in an import list is destructuring renaming, `a: b` in JS.
fn rename_bindings(list: &str) -> String {
    list.split(',')
        .filter_map(|binding| {
            let binding = binding.trim();
            if binding.is_empty() {
                return None;
            }
            Some(match binding.split_once(" as ") {
                Some((imported, local)) => format!("{}: {}", imported.trim(), local.trim()),
                None => binding.to_string(),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}
