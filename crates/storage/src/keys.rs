//! Reserved root-database keys and key-range helpers.
//!
//! The root multi-store keeps its own records under the `s/` namespace:
//! `s/latest` points at the latest version, `s/<version>` holds the commit
//! info for that version, and the `s/k:<name>/` and `s/_/` prefixes carve out
//! per-sub-store regions so sub-stores can never collide with the root's
//! records or with each other.

/// Key holding the encoded latest committed version.
pub const LATEST_VERSION_KEY: &[u8] = b"s/latest";

/// Prefix assigned to a sub-store mounted with its own dedicated database.
pub const DEDICATED_DB_PREFIX: &[u8] = b"s/_/";

/// Key holding the encoded commit info for `version`.
pub fn commit_info_key(version: u64) -> Vec<u8> {
    format!("s/{version}").into_bytes()
}

/// Prefix assigned to a sub-store sharing the root database.
pub fn shared_store_prefix(name: &str) -> Vec<u8> {
    format!("s/k:{name}/").into_bytes()
}

/// Compute the exclusive end key for a prefix scan.
///
/// Returns `None` if the prefix is all `0xFF` bytes (no valid exclusive upper
/// bound). In practice this never happens with structured storage keys.
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    debug_assert!(!prefix.is_empty(), "next_prefix called with empty prefix");
    let mut next = prefix.to_vec();
    for i in (0..next.len()).rev() {
        if next[i] < 255 {
            next[i] += 1;
            return Some(next);
        }
        next[i] = 0;
    }
    None
}
