//! # docshard
//!
//! A sharded document store coordinator:
//! - Deterministic placement: BLAKE3(key) modulo node count
//! - Lookup on the expected node first, fallback scan of the others
//! - Per-node load distribution and balance reporting
//! - Pluggable node backends: in-memory, file log, remote HTTP node, Sled
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              DocumentStore              │
//! │   insert / find / clear / stats         │
//! │   Placement: blake3(key) % node_count   │
//! └───────────┬─────────────────────────────┘
//!             │ NodeRegistry (ordinal = declared position)
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌───▼──────────┐
//! │ Node 0     │   │ Node 1     │   │ Node 2       │
//! │ mem://     │   │ file://    │   │ http://      │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start storage nodes
//! ```bash
//! docshard-node serve --bind 127.0.0.1:7101 --data ./node-1
//! docshard-node serve --bind 127.0.0.1:7102 --data ./node-2
//! ```
//!
//! ### Use the CLI
//! ```bash
//! export DOCSHARD_NODES=http://127.0.0.1:7101,http://127.0.0.1:7102
//!
//! docshard demo --count 100
//! docshard insert --key doc_0001 --json '{"title": "hello"}'
//! docshard find doc_0001
//! docshard stats --json
//! docshard clear
//! ```
//!
//! ### As a library
//! ```no_run
//! use docshard::{Document, DocumentStore};
//! use std::time::Duration;
//!
//! let store = DocumentStore::connect(&["mem://a", "mem://b"], Duration::from_secs(5))?;
//! let outcome = store.insert(Document::default().field("title", "hello"))?;
//! assert!(store.find(&outcome.key)?.is_some());
//! println!("{}", store.stats());
//! # Ok::<(), docshard::Error>(())
//! ```

pub mod common;
pub mod coordinator;
pub mod node;
pub mod ops;

// Re-export commonly used types
pub use common::{Config, Document, Error, InsertOutcome, Result, StoredDocument};
pub use coordinator::{DistributionReport, DocumentStore, NodeRegistry};
pub use node::NodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
