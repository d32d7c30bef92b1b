//! Node registry
//!
//! Holds one slot per declared node address, in declared order. A slot's
//! position is its ordinal: an address that cannot be reached at startup
//! keeps its slot (marked unavailable) instead of shifting the nodes after
//! it, so routing stays stable whichever nodes happen to be up.

use crate::common::{Error, NodeBackend, NodeState, Result};
use crate::coordinator::connector::{BackendConnector, Connector};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// One declared storage node
pub struct NodeSlot {
    index: usize,
    address: String,
    state: NodeState,
    error: Option<String>,
    handle: Option<Box<dyn NodeBackend>>,
}

impl NodeSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Why the node is unavailable, if it is
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl std::fmt::Debug for NodeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSlot")
            .field("index", &self.index)
            .field("address", &self.address)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

/// Fixed, ordered set of storage nodes established at startup
#[derive(Debug)]
pub struct NodeRegistry {
    slots: Vec<NodeSlot>,
    closed: bool,
}

impl NodeRegistry {
    /// Connect to `addresses` with the default [`BackendConnector`].
    pub fn connect<S: AsRef<str>>(addresses: &[S], per_node_timeout: Duration) -> Result<Self> {
        Self::initialize(
            addresses,
            per_node_timeout,
            Arc::new(BackendConnector::new()),
        )
    }

    /// Probe every address in order, one at a time.
    ///
    /// Each attempt (connect + ping) gets `per_node_timeout`; there are no
    /// retries. Fails with [`Error::Connection`] unless at least one node
    /// answers.
    pub fn initialize<S: AsRef<str>>(
        addresses: &[S],
        per_node_timeout: Duration,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        if addresses.is_empty() {
            return Err(Error::Connection("no node addresses configured".into()));
        }

        tracing::info!("Connecting to {} storage nodes", addresses.len());

        let mut slots = Vec::with_capacity(addresses.len());
        for (index, address) in addresses.iter().enumerate() {
            let address = address.as_ref().to_string();
            match Self::attempt(index, &address, per_node_timeout, connector.clone()) {
                Ok(handle) => {
                    tracing::info!("  ✓ Node {} connected: {}", index, address);
                    slots.push(NodeSlot {
                        index,
                        address,
                        state: NodeState::Available,
                        error: None,
                        handle: Some(handle),
                    });
                }
                Err(e) => {
                    tracing::warn!("  ✗ Node {} unavailable ({}): {}", index, address, e);
                    slots.push(NodeSlot {
                        index,
                        address,
                        state: NodeState::Unavailable,
                        error: Some(e.to_string()),
                        handle: None,
                    });
                }
            }
        }

        let registry = Self {
            slots,
            closed: false,
        };

        if registry.available_count() == 0 {
            let reasons: Vec<String> = registry
                .slots
                .iter()
                .map(|s| format!("{}: {}", s.address, s.error.as_deref().unwrap_or("unknown")))
                .collect();
            return Err(Error::Connection(reasons.join("; ")));
        }

        tracing::info!(
            "Registry initialized: {}/{} nodes available",
            registry.available_count(),
            registry.node_count()
        );

        Ok(registry)
    }

    /// Connect and ping on a worker thread, giving up after `timeout`.
    fn attempt(
        index: usize,
        address: &str,
        timeout: Duration,
        connector: Arc<dyn Connector>,
    ) -> Result<Box<dyn NodeBackend>> {
        let (tx, rx) = mpsc::channel();
        let target = address.to_string();

        std::thread::Builder::new()
            .name(format!("docshard-connect-{}", index))
            .spawn(move || {
                let result = connector.connect(&target, timeout).and_then(|handle| {
                    handle.ping()?;
                    Ok(handle)
                });
                // the receiver is gone if the attempt already timed out
                let _ = tx.send(result);
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::Timeout(format!(
                "no answer from {} within {:?}",
                address, timeout
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Internal(format!(
                "connection attempt to {} aborted",
                address
            ))),
        }
    }

    /// Number of declared nodes, reachable or not. Fixed for the registry's lifetime.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of nodes that passed the startup probe and are still open
    pub fn available_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state.is_available())
            .count()
    }

    /// Backend handle for node `index`.
    pub fn handle(&self, index: usize) -> Result<&dyn NodeBackend> {
        let slot = self.slot(index)?;
        if self.closed {
            return Err(Error::RegistryClosed);
        }
        slot.handle.as_deref().ok_or_else(|| Error::NodeUnavailable {
            index,
            address: slot.address.clone(),
        })
    }

    pub fn slot(&self, index: usize) -> Result<&NodeSlot> {
        self.slots.get(index).ok_or(Error::NodeOutOfRange {
            index,
            count: self.slots.len(),
        })
    }

    pub fn slots(&self) -> &[NodeSlot] {
        &self.slots
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release every live handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                if let Err(e) = handle.close() {
                    tracing::warn!("Failed to close node {} ({}): {}", slot.index, slot.address, e);
                }
                slot.state = NodeState::Closed;
            }
        }

        self.closed = true;
        tracing::info!("Node connections closed");
    }
}

impl Drop for NodeRegistry {
    fn drop(&mut self) {
        self.close();
    }
}
