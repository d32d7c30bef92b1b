//! Common utilities and types shared across docshard

pub mod config;
pub mod document;
pub mod error;
pub mod hash;
pub mod storage;
pub mod utils;

pub use config::{Config, LogSyncPolicy, NodeConfig};
pub use document::{Document, InsertOutcome, Payload, StoredDocument};
pub use error::{Error, Result};
pub use hash::node_for_key;
#[cfg(feature = "sled-backend")]
pub use storage::SledBackend;
pub use storage::{MemoryBackend, NodeBackend};
pub use utils::{
    crc32, generate_document_key, parse_duration, timestamp_now_micros, validate_key,
    NodeState,
};
