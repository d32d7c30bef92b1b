//! Sample documents for demos and load checks

use crate::common::{Document, Payload};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;

const CATEGORIES: [&str; 5] = ["technology", "science", "art", "sports", "music"];

/// Key of the `i`-th sample document (`doc_0000`, `doc_0001`, ...)
pub fn sample_key(i: usize) -> String {
    format!("doc_{:04}", i)
}

/// Generate `count` sample documents keyed `doc_0000`..
pub fn generate_sample_documents<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Document> {
    let created = Utc::now().to_rfc3339();

    (0..count)
        .map(|i| {
            let mut payload = Payload::new();
            payload.insert("title".into(), json!(format!("Document {}", i)));
            payload.insert(
                "category".into(),
                json!(CATEGORIES.choose(rng).copied().unwrap_or("technology")),
            );
            payload.insert("value".into(), json!(rng.gen_range(1..=1000)));
            payload.insert(
                "description".into(),
                json!(format!("Sample document number {}", i)),
            );
            payload.insert("created".into(), json!(created));
            Document::with_key(sample_key(i), payload)
        })
        .collect()
}
