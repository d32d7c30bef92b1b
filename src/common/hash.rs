//! Hashing utilities for docshard
//!
//! Placement reduces the full 256-bit BLAKE3 digest of a key modulo the
//! node count. The digest is uniform, so keys spread evenly across nodes.

/// Map a key to a node ordinal in `[0, node_count)`.
///
/// The digest is read as a big-endian integer and reduced byte by byte, so
/// all 256 bits take part in the result.
///
/// # Panics
///
/// Panics if `node_count` is zero.
pub fn node_for_key(key: &str, node_count: usize) -> usize {
    assert!(node_count > 0, "node_for_key called with zero nodes");

    let digest = blake3::hash(key.as_bytes());
    let modulus = node_count as u128;
    let rem = digest
        .as_bytes()
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | byte as u128) % modulus);

    rem as usize
}
