//! Module resolution.
//!
//! Maps a `(specifier, importer)` pair to an absolute path using the
//! immutable [`ResolveOptions`]: alias table first, then the importer's
//! directory for relative specifiers, then each search root in declared
//! order. Extensionless candidates are tried with each recognized
//! extension in priority order, domain-specific source first.
//!
//! Resolution is a pure function of its inputs plus static configuration;
//! the same request always yields the same path.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use plinth_config::ResolveOptions;

use crate::category::FileCategory;
use crate::error::{GraphError, Result};

pub struct Resolver {
    root: PathBuf,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, options: ResolveOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Project root all relative configuration is anchored to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a specifier against its importer.
    ///
    /// Fails with [`GraphError::Resolution`] when no candidate exists;
    /// this is fatal for the enclosing build pass.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        if let Some(path) = self.try_resolve(specifier, importer) {
            return Ok(path);
        }
        Err(GraphError::Resolution {
            specifier: specifier.to_string(),
            importer: importer.to_path_buf(),
        })
    }

    fn try_resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        // 1. Alias table, exact prefix match in declared order.
        for (prefix, target) in &self.options.alias {
            if let Some(rest) = strip_alias(specifier, prefix) {
                let base = self.root.join(target);
                let candidate = if rest.is_empty() {
                    base
                } else {
                    base.join(rest)
                };
                if let Some(path) = self.existing_with_extensions(&candidate) {
                    return Some(path);
                }
            }
        }

        // 2. Relative specifiers resolve against the importer's directory.
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let dir = importer.parent()?;
            return self.existing_with_extensions(&dir.join(specifier));
        }

        // 3. Absolute specifiers are taken as-is.
        if Path::new(specifier).is_absolute() {
            return self.existing_with_extensions(Path::new(specifier));
        }

        // 4. Bare specifiers search each configured root in declared order.
        //    Dotted module names (`Marlowe.Semantics`) also map to nested
        //    paths, the convention of the functional-language compiler.
        for root in &self.options.roots {
            let base = self.root.join(root);
            if let Some(path) = self.existing_with_extensions(&base.join(specifier)) {
                return Some(path);
            }
            if specifier.contains('.') && !specifier.contains('/') {
                let nested = specifier.replace('.', "/");
                if let Some(path) = self.existing_with_extensions(&base.join(nested)) {
                    return Some(path);
                }
            }
        }

        None
    }

    /// Try a candidate as-is (when it already names a recognized file
    /// kind), then with each configured extension in priority order.
    fn existing_with_extensions(&self, candidate: &Path) -> Option<PathBuf> {
        let candidate = candidate.to_path_buf().clean();

        if FileCategory::from_path(&candidate).is_some() && candidate.is_file() {
            return Some(candidate);
        }

        let name = candidate.file_name()?.to_str()?.to_string();
        for ext in &self.options.extensions {
            let with_ext = candidate.with_file_name(format!("{name}.{ext}"));
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }
}

fn strip_alias<'s>(specifier: &'s str, prefix: &str) -> Option<&'s str> {
    if specifier == prefix {
        return Some("");
    }
    specifier
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
}
