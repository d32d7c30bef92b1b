//! File-backed document collection
//!
//! Documents are kept in memory, keyed by document key, and every insert is
//! appended to a [`DocumentLog`] first. Reopening the directory replays the
//! log, so the collection survives restarts.

use crate::common::{Error, LogSyncPolicy, NodeBackend, Result, StoredDocument};
use crate::node::log::DocumentLog;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const LOG_FILE: &str = "documents.log";

struct CollectionState {
    log: DocumentLog,
    documents: HashMap<String, StoredDocument>,
}

/// Persistent collection stored under a directory
pub struct FileCollection {
    dir: PathBuf,
    state: Mutex<CollectionState>,
}

impl FileCollection {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir, LogSyncPolicy::default())
    }

    pub fn open_with(dir: impl AsRef<Path>, sync_policy: LogSyncPolicy) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut documents = HashMap::new();
        let log = DocumentLog::open(dir.join(LOG_FILE), sync_policy, |entry| {
            documents.insert(entry.document.key.clone(), entry.document);
            Ok(())
        })?;

        tracing::info!(
            "Collection opened at {}: {} documents",
            dir.display(),
            documents.len()
        );

        Ok(Self {
            dir,
            state: Mutex::new(CollectionState { log, documents }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, CollectionState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal(format!("{} lock poisoned", self.dir.display())))
    }
}

impl NodeBackend for FileCollection {
    fn ping(&self) -> Result<()> {
        let state = self.lock()?;
        std::fs::metadata(state.log.path())?;
        Ok(())
    }

    fn insert_one(&self, document: &StoredDocument) -> Result<bool> {
        let mut state = self.lock()?;
        if state.documents.contains_key(&document.key) {
            return Err(Error::DuplicateKey(document.key.clone()));
        }

        state.log.append(document)?;
        state
            .documents
            .insert(document.key.clone(), document.clone());
        Ok(true)
    }

    fn find_one(&self, key: &str) -> Result<Option<StoredDocument>> {
        let state = self.lock()?;
        Ok(state.documents.get(key).cloned())
    }

    fn count_all(&self) -> Result<u64> {
        let state = self.lock()?;
        Ok(state.documents.len() as u64)
    }

    fn delete_all(&self) -> Result<u64> {
        let mut state = self.lock()?;
        state.log.truncate()?;
        let deleted = state.documents.len() as u64;
        state.documents.clear();
        Ok(deleted)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.log.sync_on_close()
    }
}
