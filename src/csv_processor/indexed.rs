use crate::csv_processor::index::{build_index, IndexBuild, OffsetIndex};
use crate::csv_processor::reader::{detect_bom, file_exists, Record, RecordParser};
use crate::state::{cache_key, CacheEntry, CacheStore, FileStamp};
use crate::utils::{CsvReaderError, ReaderConfig, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A record paired positionally with the header.
pub type KeyedRecord = Vec<(String, String)>;

/// Random access to the rows of one delimited text file.
///
/// Construction scans the file once (or adopts a fresh cached index) and
/// leaves the stream at the first data row. After that, reaching row `n`
/// costs one seek plus at most `checkpoint_interval` record parses.
pub struct IndexedReader {
    path: PathBuf,
    parser: RecordParser<File>,
    index: OffsetIndex,
    headers: Vec<String>,
    row_count: usize,
    first_row_offset: u64,
}

impl IndexedReader {
    pub fn open(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self> {
        Self::open_with_store(path, config, None)
    }

    /// Opens `path`, consulting `store` for a cached index when
    /// `config.use_cache` is set.
    pub fn open_with_store(
        path: impl AsRef<Path>,
        config: &ReaderConfig,
        store: Option<&dyn CacheStore>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let dialect = config.validate()?;

        if !file_exists(path) {
            return Err(CsvReaderError::FileNotFound(path.display().to_string()));
        }

        let open_failed = |source| CsvReaderError::OpenFailed {
            path: path.display().to_string(),
            source,
        };
        let mut file = File::open(path).map_err(open_failed)?;
        let metadata = file.metadata().map_err(open_failed)?;
        let stamp = FileStamp {
            modified: metadata.modified().map_err(open_failed)?,
            len: metadata.len(),
        };
        let path = path.canonicalize().map_err(open_failed)?;

        let data_start = detect_bom(&mut file).map_err(open_failed)?;
        let mut parser = RecordParser::new(file, &dialect);
        parser.seek(data_start).map_err(|e| match e {
            CsvReaderError::CsvError(e) => open_failed(e.into()),
            other => other,
        })?;

        let store = store.filter(|_| config.use_cache);
        let key = cache_key(&path);

        let cached = store.and_then(|s| load_cached(s, &key, stamp, config));
        let build = match cached {
            Some(build) => {
                info!(path = %path.display(), rows = build.row_count, "Using cached row index");
                build
            }
            None => {
                let build = build_index(&mut parser, config.has_header, config.checkpoint_interval)?;
                info!(
                    path = %path.display(),
                    rows = build.row_count,
                    checkpoints = build.index.checkpoint_count(),
                    "Built row index"
                );
                if let Some(store) = store {
                    save_cached(store, &key, &build, stamp, config.has_header);
                }
                build
            }
        };

        parser.seek(build.first_row_offset)?;

        Ok(Self {
            path,
            parser,
            index: build.index,
            headers: build.headers,
            row_count: build.row_count,
            first_row_offset: build.first_row_offset,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &OffsetIndex {
        &self.index
    }

    /// Reads the record at the current position and advances past it.
    pub fn get_next(&mut self) -> Option<Record> {
        self.parser.next_record()
    }

    /// Moves back to the first data row.
    pub fn rewind(&mut self) -> Result<()> {
        self.parser.seek(self.first_row_offset)
    }

    /// Positions the stream so the next [`get_next`](Self::get_next) returns row `target`.
    ///
    /// Running out of rows before `target` still succeeds; the next read then
    /// reports end of stream.
    pub fn skip_to(&mut self, target: usize) -> Result<()> {
        let (checkpoint, offset) = self
            .index
            .lookup_checkpoint(target)
            .ok_or(CsvReaderError::NoSuchCheckpoint(target))?;

        self.parser.seek(offset)?;
        for _ in checkpoint..target {
            if self.get_next().is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Returns up to `limit` records starting at data row `offset`.
    pub fn get_rows(&mut self, offset: usize, limit: usize) -> Vec<Record> {
        if let Err(e) = self.skip_to(offset) {
            debug!(offset, error = %e, "Could not position reader");
            return Vec::new();
        }

        let mut rows = Vec::with_capacity(limit.min(self.row_count));
        while rows.len() < limit {
            match self.get_next() {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        rows
    }

    /// Like [`get_rows`](Self::get_rows), with each field paired with its column name.
    pub fn get_keyed_rows(&mut self, offset: usize, limit: usize) -> Vec<KeyedRecord> {
        let rows = self.get_rows(offset, limit);
        rows.into_iter()
            .map(|row| pair_with_headers(&self.headers, row))
            .collect()
    }
}

/// Zips by position; whichever side is longer is cut to the shorter one.
pub fn pair_with_headers(headers: &[String], row: Record) -> KeyedRecord {
    headers.iter().cloned().zip(row).collect()
}

fn load_cached(
    store: &dyn CacheStore,
    key: &str,
    stamp: FileStamp,
    config: &ReaderConfig,
) -> Option<IndexBuild> {
    let blob = match store.get(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            debug!(key, "No cached row index");
            return None;
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to read cached row index");
            return None;
        }
    };

    let entry = match CacheEntry::decode(&blob) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable cached row index");
            return None;
        }
    };

    if !entry.is_fresh(stamp, config.has_header, config.checkpoint_interval) {
        debug!(key, "Cached row index is stale");
        return None;
    }

    match entry.into_build() {
        Ok(build) => Some(build),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable cached row index");
            None
        }
    }
}

fn save_cached(
    store: &dyn CacheStore,
    key: &str,
    build: &IndexBuild,
    stamp: FileStamp,
    has_header: bool,
) {
    let result = CacheEntry::from_build(build, stamp, has_header)
        .encode()
        .and_then(|blob| store.set(key, &blob));
    if let Err(e) = result {
        warn!(key, error = %e, "Failed to store row index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn short_row_truncates_header() {
        let keyed = pair_with_headers(&strings(&["x", "y", "z"]), strings(&["1", "2"]));
        assert_eq!(
            keyed,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn long_row_drops_trailing_fields() {
        let keyed = pair_with_headers(&strings(&["x"]), strings(&["1", "2", "3"]));
        assert_eq!(keyed, vec![("x".to_string(), "1".to_string())]);
    }

    #[test]
    fn duplicate_header_names_stay_separate() {
        let keyed = pair_with_headers(&strings(&["a", "a"]), strings(&["1", "2"]));
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed[1], ("a".to_string(), "2".to_string()));
    }
}
