//! Document store: insert and lookup across the registry's nodes
//!
//! Inserts go to exactly one node, chosen by [`PlacementManager`]. Lookups
//! ask the expected node first and fall back to scanning the others in
//! ascending ordinal order, since a stored document may have been placed
//! under a different node count or written out of band. The common case
//! costs one read; a miss costs one read per node.

use crate::common::{
    generate_document_key, validate_key, Document, Error, InsertOutcome, Result, StoredDocument,
};
use crate::coordinator::placement::PlacementManager;
use crate::coordinator::registry::NodeRegistry;
use crate::coordinator::stats::{DistributionReport, StatsReporter};
use serde::Serialize;
use std::time::Duration;

/// Outcome of `clear` on one node
#[derive(Debug, Clone, Serialize)]
pub struct NodeClear {
    pub index: usize,
    pub address: String,
    pub deleted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearReport {
    pub nodes: Vec<NodeClear>,
}

impl ClearReport {
    pub fn total_deleted(&self) -> u64 {
        self.nodes.iter().filter_map(|n| n.deleted).sum()
    }

    /// True when every node was cleared
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.error.is_none())
    }
}

/// Coordinates document placement over a [`NodeRegistry`]
#[derive(Debug)]
pub struct DocumentStore {
    registry: NodeRegistry,
    placement: PlacementManager,
}

impl DocumentStore {
    pub fn new(registry: NodeRegistry) -> Self {
        let placement = PlacementManager::new(registry.node_count());
        Self {
            registry,
            placement,
        }
    }

    /// Connect to `addresses` with the default connector and build a store.
    pub fn connect<S: AsRef<str>>(addresses: &[S], per_node_timeout: Duration) -> Result<Self> {
        Ok(Self::new(NodeRegistry::connect(addresses, per_node_timeout)?))
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn placement(&self) -> &PlacementManager {
        &self.placement
    }

    /// Insert a document on the node that owns its key.
    ///
    /// A key is generated when the document has none.
    pub fn insert(&self, document: Document) -> Result<InsertOutcome> {
        let key = match document.key {
            Some(key) => key,
            None => generate_document_key(),
        };
        validate_key(&key)?;

        let node = self.placement.route(&key);
        let stored = StoredDocument::new(key.clone(), node, document.payload);

        let acknowledged = self
            .registry
            .handle(node)?
            .insert_one(&stored)
            .map_err(|e| Error::backend(node, e))?;

        tracing::debug!("Document {} → node {}", key, node);

        Ok(InsertOutcome {
            key,
            node,
            acknowledged,
        })
    }

    /// Insert documents one after another, stopping at the first failure.
    pub fn insert_many<I>(&self, documents: I) -> Result<Vec<InsertOutcome>>
    where
        I: IntoIterator<Item = Document>,
    {
        documents.into_iter().map(|doc| self.insert(doc)).collect()
    }

    /// Find a document by key.
    ///
    /// `Ok(None)` means no reachable node holds the key. Nodes that were
    /// unavailable at startup are skipped; a read error on any node that is
    /// consulted is returned, tagged with that node's ordinal.
    pub fn find(&self, key: &str) -> Result<Option<StoredDocument>> {
        let expected = self.placement.route(key);
        let mut skipped = Vec::new();
        let mut scanning = false;

        for index in self.placement.fallback_order(key) {
            if index == expected {
                tracing::debug!("Looking up {} on expected node {}", key, index);
            } else if !scanning {
                scanning = true;
                tracing::warn!(
                    "{} not on expected node {}, scanning the other nodes",
                    key,
                    expected
                );
            }

            let handle = match self.registry.handle(index) {
                Ok(handle) => handle,
                Err(Error::NodeUnavailable { .. }) => {
                    skipped.push(index);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(document) = handle.find_one(key).map_err(|e| Error::backend(index, e))? {
                if index != expected {
                    tracing::info!("{} found on node {} (expected {})", key, index, expected);
                }
                return Ok(Some(document));
            }
        }

        if !skipped.is_empty() {
            tracing::warn!(
                "{} not found; unavailable nodes {:?} were not searched",
                key,
                skipped
            );
        } else {
            tracing::debug!("{} not found on any node", key);
        }
        Ok(None)
    }

    /// Delete every document on every node.
    ///
    /// A node that fails is recorded in the report; the rest are still cleared.
    pub fn clear(&self) -> ClearReport {
        let nodes = self
            .registry
            .slots()
            .iter()
            .map(|slot| {
                let index = slot.index();
                let result = self
                    .registry
                    .handle(index)
                    .and_then(|handle| handle.delete_all());
                match result {
                    Ok(deleted) => {
                        tracing::info!("Node {}: {} documents deleted", index, deleted);
                        NodeClear {
                            index,
                            address: slot.address().to_string(),
                            deleted: Some(deleted),
                            error: None,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Node {}: clear failed: {}", index, e);
                        NodeClear {
                            index,
                            address: slot.address().to_string(),
                            deleted: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect();

        ClearReport { nodes }
    }

    /// Per-node load distribution
    pub fn stats(&self) -> DistributionReport {
        StatsReporter::new(&self.registry).report()
    }

    /// Close every node connection. Safe to call more than once.
    pub fn close(&mut self) {
        self.registry.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MemoryBackend, NodeBackend, Payload};
    use crate::coordinator::connector::BackendConnector;
    use serde_json::json;
    use std::sync::Arc;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn store_over(connector: &Arc<BackendConnector>, names: &[&str]) -> DocumentStore {
        let addresses: Vec<String> = names.iter().map(|n| format!("mem://{}", n)).collect();
        let registry = NodeRegistry::initialize(&addresses, TIMEOUT, connector.clone()).unwrap();
        DocumentStore::new(registry)
    }

    fn payload(title: &str) -> Payload {
        let mut payload = Payload::new();
        payload.insert("title".into(), json!(title));
        payload
    }

    #[test]
    fn test_insert_routes_to_one_node() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b", "c"]);

        let outcome = store
            .insert(Document::with_key("doc_0001", payload("one")))
            .unwrap();
        assert!(outcome.acknowledged);
        assert_eq!(outcome.node, store.placement().route("doc_0001"));

        let counts: Vec<u64> = ["a", "b", "c"]
            .iter()
            .map(|n| connector.memory_collection(n).unwrap().count_all().unwrap())
            .collect();
        assert_eq!(counts.iter().sum::<u64>(), 1);
        assert_eq!(counts[outcome.node], 1);
    }

    #[test]
    fn test_insert_attaches_metadata() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b"]);

        let outcome = store.insert(Document::new(payload("untitled"))).unwrap();
        assert!(outcome.key.starts_with("doc_"));

        let found = store.find(&outcome.key).unwrap().unwrap();
        assert_eq!(found.key, outcome.key);
        assert_eq!(found.assigned_node, outcome.node);
        assert_eq!(found.payload, payload("untitled"));
    }

    #[test]
    fn test_insert_rejects_bad_key() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a"]);
        assert!(matches!(
            store.insert(Document::with_key("", Payload::new())),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_duplicate_key_is_backend_error() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b"]);
        store
            .insert(Document::with_key("dup", Payload::new()))
            .unwrap();

        match store.insert(Document::with_key("dup", Payload::new())) {
            Err(Error::Backend { node, source }) => {
                assert_eq!(node, store.placement().route("dup"));
                assert!(matches!(*source, Error::DuplicateKey(_)));
            }
            other => panic!("expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_find_missing_is_none() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b"]);
        assert!(store.find("doc_9999").unwrap().is_none());
    }

    #[test]
    fn test_find_falls_back_to_other_node() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b", "c"]);

        let key = "written-out-of-band";
        let expected = store.placement().route(key);
        let elsewhere = (expected + 2) % 3;
        let names = ["a", "b", "c"];
        connector
            .memory_collection(names[elsewhere])
            .unwrap()
            .insert_one(&StoredDocument::new(key.into(), elsewhere, payload("stray")))
            .unwrap();

        let found = store.find(key).unwrap().unwrap();
        assert_eq!(found.assigned_node, elsewhere);
        assert_eq!(found.get("title"), Some(&json!("stray")));
    }

    #[test]
    fn test_find_propagates_backend_error() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b"]);
        connector.memory_collection("a").unwrap().set_offline(true);
        connector.memory_collection("b").unwrap().set_offline(true);

        assert!(matches!(store.find("any"), Err(Error::Backend { .. })));
    }

    #[test]
    fn test_unavailable_node_skipped_on_find() {
        let connector = Arc::new(BackendConnector::new());
        let registry =
            NodeRegistry::initialize(&["bogus://x", "mem://b"], TIMEOUT, connector.clone())
                .unwrap();
        let store = DocumentStore::new(registry);

        // pick a key owned by the live node
        let key = (0..)
            .map(|i| format!("k{}", i))
            .find(|k| store.placement().route(k) == 1)
            .unwrap();
        store.insert(Document::with_key(key.clone(), Payload::new())).unwrap();
        assert!(store.find(&key).unwrap().is_some());
        assert!(store.find("nowhere").unwrap().is_none());

        let dead_key = (0..)
            .map(|i| format!("k{}", i))
            .find(|k| store.placement().route(k) == 0)
            .unwrap();
        assert!(matches!(
            store.insert(Document::with_key(dead_key, Payload::new())),
            Err(Error::NodeUnavailable { index: 0, .. })
        ));
    }

    #[test]
    fn test_clear_reports_per_node() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b", "c"]);
        for i in 0..30 {
            store
                .insert(Document::with_key(format!("doc_{}", i), Payload::new()))
                .unwrap();
        }

        let flaky: MemoryBackend = connector.memory_collection("b").unwrap();
        let on_b = flaky.count_all().unwrap();
        flaky.set_offline(true);

        let report = store.clear();
        assert!(!report.is_complete());
        assert_eq!(report.total_deleted(), 30 - on_b);
        assert!(report.nodes[1].error.is_some());

        flaky.set_offline(false);
        assert_eq!(flaky.count_all().unwrap(), on_b);
        assert_eq!(store.stats().total, on_b);
    }

    #[test]
    fn test_insert_many_stops_at_first_error() {
        let connector = Arc::new(BackendConnector::new());
        let store = store_over(&connector, &["a", "b"]);
        let docs = vec![
            Document::with_key("x1", Payload::new()),
            Document::with_key("x1", Payload::new()),
            Document::with_key("x2", Payload::new()),
        ];
        assert!(store.insert_many(docs).is_err());
        assert!(store.find("x2").unwrap().is_none());
    }

    #[test]
    fn test_close_twice() {
        let connector = Arc::new(BackendConnector::new());
        let mut store = store_over(&connector, &["a"]);
        store.close();
        store.close();
        assert!(matches!(
            store.insert(Document::with_key("k", Payload::new())),
            Err(Error::RegistryClosed)
        ));
        assert!(matches!(store.find("k"), Err(Error::RegistryClosed)));
    }
}
