//! File categories and chain selection.
//!
//! The set of recognized file kinds is closed, so dispatch is a plain enum
//! rather than open-ended plugins. A file's category is determined once
//! from its path: the longest (most specific) extension match wins, and
//! the first-declared category wins ties.

use std::path::Path;

/// Closed set of file categories, each with its own transformation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Functional smart-contract sources (`.purs`), compiled externally.
    Functional,
    /// Typed script sources (`.ts`, `.tsx`), checked and transpiled.
    TypedScript,
    /// Plain script sources (`.js`, `.mjs`), passed through.
    Script,
    /// Preprocessed stylesheets (`.scss`), expanded then printed as CSS.
    Preprocessed,
    /// Plain stylesheets (`.css`); skip the preprocessor step.
    Stylesheet,
    /// Binary assets copied under a content-hashed name.
    Asset,
}

impl FileCategory {
    /// Declaration order doubles as the tie-break order.
    pub const ALL: [FileCategory; 6] = [
        FileCategory::Functional,
        FileCategory::TypedScript,
        FileCategory::Script,
        FileCategory::Preprocessed,
        FileCategory::Stylesheet,
        FileCategory::Asset,
    ];

    /// Extensions claimed by this category, without the leading dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileCategory::Functional => &["purs"],
            FileCategory::TypedScript => &["tsx", "ts"],
            FileCategory::Script => &["mjs", "js"],
            FileCategory::Preprocessed => &["scss"],
            FileCategory::Stylesheet => &["css"],
            FileCategory::Asset => &[
                "png", "svg", "jpg", "jpeg", "gif", "ico", "woff", "woff2", "eot", "ttf", "otf",
            ],
        }
    }

    /// Categorize a path by its extension. Longest matching extension wins;
    /// declaration order breaks ties between equally specific matches.
    pub fn from_path(path: &Path) -> Option<FileCategory> {
        let name = path.file_name()?.to_str()?;

        let mut best: Option<(usize, FileCategory)> = None;
        for category in FileCategory::ALL {
            for ext in category.extensions() {
                let suffix = format!(".{ext}");
                if name.len() > suffix.len() && name.ends_with(&suffix) {
                    let specificity = suffix.len();
                    let better = match best {
                        Some((len, _)) => specificity > len,
                        None => true,
                    };
                    if better {
                        best = Some((specificity, category));
                    }
                }
            }
        }
        best.map(|(_, category)| category)
    }

    /// Whether this category's compiled output is executable module code.
    pub fn is_script(self) -> bool {
        matches!(
            self,
            FileCategory::Functional
                | FileCategory::TypedScript
                | FileCategory::Script
                | FileCategory::Asset
        )
    }

    /// Whether this category's compiled output is extracted CSS text.
    pub fn is_stylesheet(self) -> bool {
        matches!(self, FileCategory::Preprocessed | FileCategory::Stylesheet)
    }
}

/// MIME type for a served artifact path.
pub fn content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
