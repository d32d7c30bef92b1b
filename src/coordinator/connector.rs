//! Turning node addresses into backend handles
//!
//! Supported schemes:
//! - `mem://<name>`: in-process collection, shared by name for the connector's lifetime
//! - `file://<dir>`: persistent collection under `<dir>`
//! - `http://<host:port>`: remote `docshard-node`
//! - `sled://<dir>`: Sled database (`sled-backend` feature)

use crate::common::{Error, MemoryBackend, NodeBackend, Result};
use crate::coordinator::node_client::NodeClient;
use crate::node::FileCollection;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Opens a backend for one node address.
pub trait Connector: Send + Sync {
    fn connect(&self, address: &str, timeout: Duration) -> Result<Box<dyn NodeBackend>>;
}

/// Default connector dispatching on the address scheme
#[derive(Default)]
pub struct BackendConnector {
    memory: Mutex<HashMap<String, MemoryBackend>>,
}

impl BackendConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The in-memory collection called `name`, created on first use.
    pub fn memory_collection(&self, name: &str) -> Result<MemoryBackend> {
        let mut memory = self
            .memory
            .lock()
            .map_err(|_| Error::Internal("memory collections lock poisoned".into()))?;
        Ok(memory
            .entry(name.to_string())
            .or_insert_with(|| MemoryBackend::new(name))
            .clone())
    }
}

impl Connector for BackendConnector {
    fn connect(&self, address: &str, timeout: Duration) -> Result<Box<dyn NodeBackend>> {
        let (scheme, rest) = address
            .split_once("://")
            .ok_or_else(|| Error::InvalidAddress(format!("missing scheme in '{}'", address)))?;

        if rest.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "empty location in '{}'",
                address
            )));
        }

        match scheme {
            "mem" => Ok(Box::new(self.memory_collection(rest)?)),
            "file" => Ok(Box::new(FileCollection::open(rest)?)),
            "http" | "https" => Ok(Box::new(NodeClient::connect(address, timeout)?)),
            #[cfg(feature = "sled-backend")]
            "sled" => Ok(Box::new(crate::common::SledBackend::open(rest)?)),
            other => Err(Error::InvalidAddress(format!(
                "unsupported scheme '{}' in '{}'",
                other, address
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Payload, StoredDocument};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_memory_collections_shared_by_name() {
        let connector = BackendConnector::new();
        let first = connector.connect("mem://a", TIMEOUT).unwrap();
        first
            .insert_one(&StoredDocument::new("k".into(), 0, Payload::new()))
            .unwrap();

        let again = connector.connect("mem://a", TIMEOUT).unwrap();
        assert_eq!(again.count_all().unwrap(), 1);

        let other = connector.connect("mem://b", TIMEOUT).unwrap();
        assert_eq!(other.count_all().unwrap(), 0);
    }

    #[test]
    fn test_file_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let address = format!("file://{}", dir.path().join("node-0").display());
        let backend = BackendConnector::new().connect(&address, TIMEOUT).unwrap();
        backend.ping().unwrap();
        assert_eq!(backend.count_all().unwrap(), 0);
    }

    #[test]
    fn test_bad_addresses() {
        let connector = BackendConnector::new();
        assert!(matches!(
            connector.connect("localhost:27017", TIMEOUT),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            connector.connect("mem://", TIMEOUT),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            connector.connect("ftp://host", TIMEOUT),
            Err(Error::InvalidAddress(_))
        ));
    }
}
