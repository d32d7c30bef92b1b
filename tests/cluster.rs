//! End-to-end tests over in-memory and file-backed clusters

use docshard::common::{Document, Error, NodeBackend, NodeState, Payload};
use docshard::coordinator::{route, BackendConnector, NodeRegistry};
use docshard::ops::{generate_sample_documents, sample_key};
use docshard::DocumentStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(2);

#[test]
fn test_two_node_sample_run() {
    let connector = Arc::new(BackendConnector::new());
    let registry =
        NodeRegistry::initialize(&["mem://node-1", "mem://node-2"], TIMEOUT, connector.clone())
            .unwrap();
    let mut store = DocumentStore::new(registry);

    let docs = generate_sample_documents(100, &mut StdRng::seed_from_u64(42));
    let outcomes = store.insert_many(docs.clone()).unwrap();
    assert_eq!(outcomes.len(), 100);
    assert!(outcomes.iter().all(|o| o.acknowledged));

    // every document sits on exactly the node its key routes to
    let node_1 = connector.memory_collection("node-1").unwrap();
    let node_2 = connector.memory_collection("node-2").unwrap();
    for i in 0..100 {
        let key = sample_key(i);
        let expected = route(&key, 2);
        let on_1 = node_1.find_one(&key).unwrap().is_some();
        let on_2 = node_2.find_one(&key).unwrap().is_some();
        assert_eq!((on_1, on_2), (expected == 0, expected == 1), "{}", key);
    }

    let report = store.stats();
    assert_eq!(report.total, 100);
    assert_eq!(report.nodes.len(), 2);
    assert_eq!(
        report.nodes[0].count.unwrap() + report.nodes[1].count.unwrap(),
        100
    );

    for original in &docs {
        let key = original.key.as_deref().unwrap();
        let found = store.find(key).unwrap().unwrap();
        assert_eq!(found.key, key);
        assert_eq!(found.assigned_node, route(key, 2));
        assert_eq!(found.payload, original.payload, "{}", key);
    }
    assert!(store.find("doc_9999").unwrap().is_none());

    let cleared = store.clear();
    assert!(cleared.is_complete());
    assert_eq!(cleared.total_deleted(), 100);

    let after = store.stats();
    assert_eq!(after.total, 0);
    assert!(after.nodes.iter().all(|n| n.count == Some(0)));

    store.close();
    store.close();
}

#[test]
fn test_no_reachable_nodes() {
    let err = DocumentStore::connect(&["nope://a", "also-bad"], TIMEOUT).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));

    let empty: [&str; 0] = [];
    let err = DocumentStore::connect(&empty, TIMEOUT).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[test]
fn test_ordinals_follow_declared_order() {
    let connector = Arc::new(BackendConnector::new());
    let registry = NodeRegistry::initialize(
        &["mem://a", "unknown://b", "mem://c"],
        TIMEOUT,
        connector,
    )
    .unwrap();

    assert_eq!(registry.node_count(), 3);
    assert_eq!(registry.available_count(), 2);

    let states: Vec<NodeState> = registry.slots().iter().map(|s| s.state()).collect();
    assert_eq!(
        states,
        vec![NodeState::Available, NodeState::Unavailable, NodeState::Available]
    );
    assert_eq!(registry.slot(1).unwrap().address(), "unknown://b");
    assert!(registry.slot(1).unwrap().error().is_some());

    // placement still uses all three declared slots
    let store = DocumentStore::new(registry);
    assert_eq!(store.placement().node_count(), 3);

    let report = store.stats();
    assert!(!report.is_complete());
    assert!(report.nodes[1].count.is_none());
    assert!(report.nodes[1].error.is_some());
}

#[test]
fn test_file_cluster_survives_restart() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let addresses = vec![
        format!("file://{}", dir_a.path().display()),
        format!("file://{}", dir_b.path().display()),
    ];

    let keys: Vec<String> = {
        let mut store = DocumentStore::connect(&addresses, TIMEOUT).unwrap();
        let keys = (0..20)
            .map(|i| {
                let mut payload = Payload::new();
                payload.insert("n".into(), json!(i));
                store.insert(Document::new(payload)).unwrap().key
            })
            .collect();
        store.close();
        keys
    };

    let store = DocumentStore::connect(&addresses, TIMEOUT).unwrap();
    assert_eq!(store.stats().total, 20);
    for (i, key) in keys.iter().enumerate() {
        let doc = store.find(key).unwrap().unwrap();
        assert_eq!(doc.get("n"), Some(&json!(i)));
    }
}
