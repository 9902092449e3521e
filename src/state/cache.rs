use crate::csv_processor::index::{IndexBuild, OffsetIndex};
use crate::utils::{CsvReaderError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

const CACHE_KEY_PREFIX: &str = "csv_cache_";

/// Key/value store the index cache is persisted in.
///
/// Values are opaque to the store. Implementations must tolerate concurrent
/// writers to the same key; the last write wins.
pub trait CacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Persisted snapshot of an index plus what is needed to judge its freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub last_modified: SystemTime,
    pub file_len: u64,
    pub has_header: bool,
    pub checkpoint_interval: usize,
    pub offsets: Vec<(usize, u64)>,
    pub first_row_offset: u64,
    pub row_count: usize,
    pub header: Vec<String>,
}

/// What the reader knows about the file at the time it opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: SystemTime,
    pub len: u64,
}

impl CacheEntry {
    pub fn from_build(build: &IndexBuild, stamp: FileStamp, has_header: bool) -> Self {
        Self {
            last_modified: stamp.modified,
            file_len: stamp.len,
            has_header,
            checkpoint_interval: build.index.interval(),
            offsets: build.index.entries(),
            first_row_offset: build.first_row_offset,
            row_count: build.row_count,
            header: build.headers.clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CsvReaderError::SerializationError(e.to_string()))
    }

    pub fn decode(blob: &[u8]) -> Result<Self> {
        serde_json::from_slice(blob).map_err(|e| CsvReaderError::CacheCorrupt(e.to_string()))
    }

    /// An entry is trusted only if the file has not been touched since it was
    /// written and it was built with the same header flag and interval.
    pub fn is_fresh(&self, stamp: FileStamp, has_header: bool, interval: usize) -> bool {
        self.last_modified >= stamp.modified
            && self.file_len == stamp.len
            && self.has_header == has_header
            && self.checkpoint_interval == interval
    }

    pub fn into_build(self) -> Result<IndexBuild> {
        let index = OffsetIndex::from_checkpoints(self.checkpoint_interval, &self.offsets)?;
        if index.first_row_offset() != self.first_row_offset {
            return Err(CsvReaderError::CacheCorrupt(format!(
                "first row offset {} disagrees with index entry {}",
                self.first_row_offset,
                index.first_row_offset()
            )));
        }

        Ok(IndexBuild {
            index,
            headers: self.header,
            row_count: self.row_count,
            first_row_offset: self.first_row_offset,
        })
    }
}

/// Derives the store key from the file's absolute path only.
pub fn cache_key(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    format!("{}{:x}", CACHE_KEY_PREFIX, digest)
}

/// Process-local store, mostly useful in tests and one-shot tools.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
