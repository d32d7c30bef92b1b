//! Append-only document log
//!
//! Every insert on a file-backed node is appended here before it becomes
//! visible. On open the log is replayed to rebuild the collection.
//! Record format: [MAGIC][SEQUENCE][OP][BODY_LEN][BODY][CRC32]
//!
//! `delete_all` truncates the log instead of appending a tombstone.

use crate::common::{crc32, Error, LogSyncPolicy, Result, StoredDocument};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

const LOG_MAGIC: [u8; 4] = [0x44, 0x4F, 0x43, 0x31]; // "DOC1"
const OP_PUT: u8 = 1;
const HEADER_LEN: usize = 13;

/// Largest body a record may declare
const MAX_BODY_LEN: usize = 64 * 1024 * 1024;

/// A replayed log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub sequence: u64,
    pub document: StoredDocument,
}

/// Append-only log of stored documents
pub struct DocumentLog {
    path: PathBuf,
    file: File,
    /// Length of the log up to the last complete record
    len: u64,
    /// Set when a failed append could not be rolled back
    poisoned: bool,
    next_sequence: u64,
    sync_policy: LogSyncPolicy,
    #[cfg(test)]
    fail_next_write_after: Option<usize>,
}

impl DocumentLog {
    /// Open or create the log, replaying existing records through `on_entry`.
    pub fn open<F>(path: impl AsRef<Path>, sync_policy: LogSyncPolicy, on_entry: F) -> Result<Self>
    where
        F: FnMut(LogEntry) -> Result<()>,
    {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (next_sequence, valid_len, corrupted) = Self::replay(&path, on_entry)?;
        if corrupted {
            // drop the torn tail so new records are not appended after garbage
            tracing::warn!(
                "Truncating {} to {} bytes after a corrupted record",
                path.display(),
                valid_len
            );
            OpenOptions::new().write(true).open(&path)?.set_len(valid_len)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            len,
            poisoned: false,
            next_sequence,
            sync_policy,
            #[cfg(test)]
            fail_next_write_after: None,
        })
    }

    /// Replay the log. Returns the next sequence number, the length of the
    /// valid prefix and whether a corrupted record ended the replay.
    ///
    /// Only a torn or corrupted record stops the replay; any other I/O
    /// error is returned and the file is left untouched.
    fn replay<F>(path: &Path, mut on_entry: F) -> Result<(u64, u64, bool)>
    where
        F: FnMut(LogEntry) -> Result<()>,
    {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((0, 0, false)),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut next_sequence = 0;
        let mut valid_len = 0u64;

        loop {
            match Self::read_entry(&mut reader) {
                Ok(Some((entry, record_len))) => {
                    next_sequence = next_sequence.max(entry.sequence + 1);
                    valid_len += record_len;
                    on_entry(entry)?;
                }
                Ok(None) => return Ok((next_sequence, valid_len, false)),
                Err(e) if is_corruption(&e) => {
                    tracing::warn!("Document log replay stopped at corrupted record: {}", e);
                    return Ok((next_sequence, valid_len, true));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Append a document. Returns the sequence number assigned to it.
    ///
    /// The record is written in one piece. If the write fails, the file is
    /// cut back to its previous length; if that fails too, the log refuses
    /// further appends so no record can land behind a torn one.
    pub fn append(&mut self, document: &StoredDocument) -> Result<u64> {
        if self.poisoned {
            return Err(Error::Log(format!(
                "{} is unusable after a failed write; reopen it",
                self.path.display()
            )));
        }

        let sequence = self.next_sequence;
        let record = encode_record(sequence, document)?;

        if let Err(e) = self.write_record(&record) {
            self.rollback();
            return Err(e);
        }

        self.len += record.len() as u64;
        self.next_sequence += 1;
        Ok(sequence)
    }

    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        #[cfg(test)]
        if let Some(n) = self.fail_next_write_after.take() {
            self.file.write_all(&record[..n.min(record.len())])?;
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }

        self.file.write_all(record)?;
        if self.sync_policy == LogSyncPolicy::Always {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            tracing::error!(
                "Could not roll back {} to {} bytes: {}",
                self.path.display(),
                self.len,
                e
            );
            self.poisoned = true;
        }
    }

    /// Read one record, returning it with its size on disk.
    fn read_entry<R: Read>(reader: &mut R) -> Result<Option<(LogEntry, u64)>> {
        let mut magic = [0u8; 4];
        match reader.read_exact(&mut magic) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if magic != LOG_MAGIC {
            return Err(Error::Log("invalid record magic".into()));
        }

        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header)?;
        let sequence = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let op = header[8];
        let body_len = u32::from_le_bytes(header[9..13].try_into().unwrap_or_default()) as usize;

        if body_len > MAX_BODY_LEN {
            return Err(Error::Log(format!("record body too large: {}", body_len)));
        }

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);

        let mut checksum_data = header.to_vec();
        checksum_data.extend_from_slice(&body);
        if crc32(&checksum_data) != stored_checksum {
            return Err(Error::Log("checksum mismatch".into()));
        }

        if op != OP_PUT {
            return Err(Error::Log(format!("unknown op code: {}", op)));
        }

        let document = serde_json::from_slice(&body)?;
        let record_len = (LOG_MAGIC.len() + HEADER_LEN + body_len + 4) as u64;
        Ok(Some((LogEntry { sequence, document }, record_len)))
    }

    /// Drop every record
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        self.poisoned = false;
        self.next_sequence = 0;
        Ok(())
    }

    /// Sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Final sync before the owner goes away. Skipped under `LogSyncPolicy::Never`.
    pub fn sync_on_close(&mut self) -> Result<()> {
        match self.sync_policy {
            LogSyncPolicy::Never => Ok(()),
            LogSyncPolicy::Always | LogSyncPolicy::Flush => self.sync(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make the next append write only `n` bytes of its record and fail.
    #[cfg(test)]
    fn inject_write_failure(&mut self, n: usize) {
        self.fail_next_write_after = Some(n);
    }
}

/// Serialize one complete record
fn encode_record(sequence: u64, document: &StoredDocument) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(document)?;
    if body.len() > MAX_BODY_LEN {
        return Err(Error::Log(format!("document too large: {} bytes", body.len())));
    }

    let mut record = Vec::with_capacity(LOG_MAGIC.len() + HEADER_LEN + body.len() + 4);
    record.extend_from_slice(&LOG_MAGIC);
    record.extend_from_slice(&sequence.to_le_bytes());
    record.push(OP_PUT);
    record.extend_from_slice(&(body.len() as u32).to_le_bytes());
    record.extend_from_slice(&body);

    let checksum = crc32(&record[LOG_MAGIC.len()..]);
    record.extend_from_slice(&checksum.to_le_bytes());
    Ok(record)
}

/// Torn or malformed data, as opposed to a failing device
fn is_corruption(error: &Error) -> bool {
    match error {
        Error::Log(_) | Error::Serialization(_) => true,
        Error::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        _ => false,
    }
}
