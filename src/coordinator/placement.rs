//! Placement strategy: hash of the key modulo the node count
//!
//! Placement is a pure function of `(key, node_count)`. The node count is
//! fixed for the lifetime of a registry; nothing is rehashed when it changes
//! between runs, which is why lookups fall back to scanning every node.

use crate::common::node_for_key;

/// Route a key to a node ordinal in `[0, node_count)`.
///
/// # Panics
///
/// Panics if `node_count` is zero.
pub fn route(key: &str, node_count: usize) -> usize {
    node_for_key(key, node_count)
}

/// PlacementManager routes keys over a fixed number of nodes.
#[derive(Debug, Clone, Copy)]
pub struct PlacementManager {
    node_count: usize,
}

impl PlacementManager {
    /// # Panics
    ///
    /// Panics if `node_count` is zero.
    pub fn new(node_count: usize) -> Self {
        assert!(node_count > 0, "placement needs at least one node");
        Self { node_count }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Ordinal that owns `key`
    pub fn route(&self, key: &str) -> usize {
        route(key, self.node_count)
    }

    /// Lookup order for `key`: the expected ordinal, then every other one ascending.
    pub fn fallback_order(&self, key: &str) -> impl Iterator<Item = usize> {
        let expected = self.route(key);
        std::iter::once(expected).chain((0..self.node_count).filter(move |&i| i != expected))
    }
}
