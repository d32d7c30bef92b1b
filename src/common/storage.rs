/// Storage backend abstraction for docshard nodes
///
/// Every storage node exposes one document collection through [`NodeBackend`].
/// In-memory and (optionally) Sled collections live here; the file-backed
/// collection is in `node::collection` and remote nodes in
/// `coordinator::node_client`.
use crate::common::{Error, Result, StoredDocument};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Operations a storage node must support
pub trait NodeBackend: Send + Sync {
    /// Lightweight health probe, used when the registry starts up.
    fn ping(&self) -> Result<()>;

    /// Store a document. Returns whether the node acknowledged the write.
    /// A key already present on this node is rejected with `DuplicateKey`.
    fn insert_one(&self, document: &StoredDocument) -> Result<bool>;

    fn find_one(&self, key: &str) -> Result<Option<StoredDocument>>;

    /// Exact number of documents held by this node
    fn count_all(&self) -> Result<u64>;

    /// Remove every document, returning how many were deleted
    fn delete_all(&self) -> Result<u64>;

    /// Release the underlying handle
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    documents: RwLock<HashMap<String, StoredDocument>>,
    offline: AtomicBool,
}

/// In-memory collection
///
/// Clones share the same documents, so a collection can outlive a registry
/// and be picked up again by the next one.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    name: String,
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(MemoryInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate an outage: while offline every operation fails with `Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::Unreachable(format!("mem://{} is offline", self.name)));
        }
        Ok(())
    }

    fn poisoned(&self) -> Error {
        Error::Internal(format!("mem://{} lock poisoned", self.name))
    }
}

impl NodeBackend for MemoryBackend {
    fn ping(&self) -> Result<()> {
        self.check_online()
    }

    fn insert_one(&self, document: &StoredDocument) -> Result<bool> {
        self.check_online()?;
        let mut map = self.inner.documents.write().map_err(|_| self.poisoned())?;
        if map.contains_key(&document.key) {
            return Err(Error::DuplicateKey(document.key.clone()));
        }
        map.insert(document.key.clone(), document.clone());
        Ok(true)
    }

    fn find_one(&self, key: &str) -> Result<Option<StoredDocument>> {
        self.check_online()?;
        let map = self.inner.documents.read().map_err(|_| self.poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn count_all(&self) -> Result<u64> {
        self.check_online()?;
        let map = self.inner.documents.read().map_err(|_| self.poisoned())?;
        Ok(map.len() as u64)
    }

    fn delete_all(&self) -> Result<u64> {
        self.check_online()?;
        let mut map = self.inner.documents.write().map_err(|_| self.poisoned())?;
        let deleted = map.len() as u64;
        map.clear();
        Ok(deleted)
    }
}

/// Sled collection
#[cfg(feature = "sled-backend")]
pub struct SledBackend {
    db: sled::Db,
}

#[cfg(feature = "sled-backend")]
impl SledBackend {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

#[cfg(feature = "sled-backend")]
impl NodeBackend for SledBackend {
    fn ping(&self) -> Result<()> {
        self.db.size_on_disk()?;
        Ok(())
    }

    fn insert_one(&self, document: &StoredDocument) -> Result<bool> {
        let bytes = serde_json::to_vec(document)?;
        match self
            .db
            .compare_and_swap(document.key.as_bytes(), None::<&[u8]>, Some(bytes))?
        {
            Ok(()) => Ok(true),
            Err(_) => Err(Error::DuplicateKey(document.key.clone())),
        }
    }

    fn find_one(&self, key: &str) -> Result<Option<StoredDocument>> {
        match self.db.get(key.as_bytes())? {
            Some(ivec) => Ok(Some(serde_json::from_slice(&ivec)?)),
            None => Ok(None),
        }
    }

    fn count_all(&self) -> Result<u64> {
        Ok(self.db.len() as u64)
    }

    fn delete_all(&self) -> Result<u64> {
        let deleted = self.db.len() as u64;
        self.db.clear()?;
        Ok(deleted)
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
