//! Binary-asset chain: copy the file unchanged under a content-hashed
//! name and expose the module as a URL reference. No content decoding.

use std::path::Path;

use crate::error::Result;
use crate::hash::{content_hash, hashed_name};

use super::{ModuleBody, TransformOutput};

pub(super) fn transform(path: &Path, bytes: &[u8]) -> Result<TransformOutput> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");

    let file_name = hashed_name(stem, &content_hash(bytes), ext);

    Ok(TransformOutput {
        body: ModuleBody::Asset {
            file_name,
            bytes: bytes.to_vec(),
        },
        deps: Vec::new(),
    })
}
