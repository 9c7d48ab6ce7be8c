//! Content hashing for output artifacts.

/// Hex digest prefix length used in artifact filenames.
const HASH_LEN: usize = 16;

/// Content hash of raw bytes, truncated for filename use.
///
/// The same bytes always produce the same digest, which is what makes
/// cache-busting filenames and reproducible builds work.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = blake3::hash(bytes);
    digest.to_hex()[..HASH_LEN].to_string()
}

/// Build a hashed artifact name, e.g. `app.4ba2c911d03f8eaa.js`.
pub fn hashed_name(stem: &str, hash: &str, ext: &str) -> String {
    format!("{stem}.{hash}.{ext}")
}
