use crate::state::cache::CacheStore;
use crate::utils::{CsvReaderError, Result};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const INDEX_CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("csv_index_cache");

/// Index cache persisted in an embedded redb database file.
#[derive(Clone)]
pub struct RedbCacheStore {
    db: Arc<Database>,
}

impl RedbCacheStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(db_path)
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        {
            let _ = write_txn
                .open_table(INDEX_CACHE_TABLE)
                .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl CacheStore for RedbCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;

        let table = read_txn
            .open_table(INDEX_CACHE_TABLE)
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;

        match table.get(key) {
            Ok(Some(data)) => Ok(Some(data.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(CsvReaderError::DatabaseError(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(INDEX_CACHE_TABLE)
                .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| CsvReaderError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
