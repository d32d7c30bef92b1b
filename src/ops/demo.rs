//! End-to-end demonstration run
//!
//! Clears the cluster, inserts sample documents, reports the distribution
//! and looks up a few keys (one of which was never inserted).

use crate::common::{Result, StoredDocument};
use crate::coordinator::{ClearReport, DistributionReport, DocumentStore};
use crate::ops::sample::{generate_sample_documents, sample_key};

#[derive(Debug)]
pub struct DemoReport {
    pub cleared: ClearReport,
    pub inserted: usize,
    pub stats: DistributionReport,
    pub lookups: Vec<(String, Option<StoredDocument>)>,
}

/// Keys probed after inserting `count` documents: first, middle, last and a missing one.
pub fn probe_keys(count: usize) -> Vec<String> {
    let mut keys = Vec::new();
    if count > 0 {
        keys.push(sample_key(0));
        keys.push(sample_key(count / 2));
        keys.push(sample_key(count - 1));
    }
    keys.push(sample_key(count.max(9999)));
    keys.dedup();
    keys
}

pub fn run_demo(store: &DocumentStore, count: usize) -> Result<DemoReport> {
    tracing::info!("Starting demo with {} documents", count);

    let cleared = store.clear();

    let documents = generate_sample_documents(count, &mut rand::thread_rng());
    let outcomes = store.insert_many(documents)?;
    tracing::info!("{} documents inserted", outcomes.len());

    let stats = store.stats();

    let lookups = probe_keys(count)
        .into_iter()
        .map(|key| {
            let found = store.find(&key)?;
            Ok((key, found))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DemoReport {
        cleared,
        inserted: outcomes.len(),
        stats,
        lookups,
    })
}
