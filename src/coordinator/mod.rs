//! Coordinator: document placement over a fixed set of storage nodes
//!
//! The coordinator is responsible for:
//! - Placement decisions (BLAKE3 digest modulo node count)
//! - Node registry built once at startup, ordinals by declared position
//! - Insert and lookup (expected node first, fallback scan otherwise)
//! - Load distribution statistics

pub mod connector;
pub mod node_client;
pub mod placement;
pub mod registry;
pub mod stats;
pub mod store;

pub use connector::{BackendConnector, Connector};
pub use node_client::NodeClient;
pub use placement::{route, PlacementManager};
pub use registry::{NodeRegistry, NodeSlot};
pub use stats::{BalanceBand, DistributionReport, NodeLoad, StatsReporter};
pub use store::{ClearReport, DocumentStore, NodeClear};
