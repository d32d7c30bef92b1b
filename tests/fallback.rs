//! Lookups after the node count changes

use docshard::common::{Document, Payload};
use docshard::coordinator::{route, BackendConnector, NodeRegistry};
use docshard::DocumentStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(2);

fn titled(i: usize) -> Document {
    let mut payload = Payload::new();
    payload.insert("title".into(), json!(format!("Document {}", i)));
    Document::with_key(format!("doc_{:04}", i), payload)
}

#[test]
fn test_find_after_growing_cluster() {
    let connector = Arc::new(BackendConnector::new());

    {
        let registry =
            NodeRegistry::initialize(&["mem://n0", "mem://n1"], TIMEOUT, connector.clone())
                .unwrap();
        let store = DocumentStore::new(registry);
        store.insert_many((0..200).map(titled)).unwrap();
    }

    // same collections, one more node: some keys now route elsewhere
    let registry = NodeRegistry::initialize(
        &["mem://n0", "mem://n1", "mem://n2"],
        TIMEOUT,
        connector.clone(),
    )
    .unwrap();
    let store = DocumentStore::new(registry);

    let moved = (0..200)
        .filter(|i| {
            let key = format!("doc_{:04}", i);
            route(&key, 2) != route(&key, 3)
        })
        .count();
    assert!(moved > 0);

    for i in 0..200 {
        let key = format!("doc_{:04}", i);
        let doc = store.find(&key).unwrap().unwrap();
        // assigned_node records where the document was placed originally
        assert_eq!(doc.assigned_node, route(&key, 2));
        assert_eq!(doc.get("title"), Some(&json!(format!("Document {}", i))));
    }

    assert_eq!(store.stats().total, 200);
    assert_eq!(store.stats().nodes[2].count, Some(0));
}

#[test]
fn test_find_after_shrinking_file_cluster() {
    let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
    let addresses: Vec<String> = dirs
        .iter()
        .map(|d| format!("file://{}", d.path().display()))
        .collect();

    {
        let mut store = DocumentStore::connect(&addresses, TIMEOUT).unwrap();
        store.insert_many((0..60).map(titled)).unwrap();
        store.close();
    }

    // drop the last node; its documents are out of reach, the rest are found
    let store = DocumentStore::connect(&addresses[..2], TIMEOUT).unwrap();
    for i in 0..60 {
        let key = format!("doc_{:04}", i);
        let found = store.find(&key).unwrap();
        assert_eq!(found.is_some(), route(&key, 3) != 2, "{}", key);
    }
}
