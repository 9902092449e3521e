pub mod csv_processor;
pub mod state;
pub mod utils;

pub use csv_processor::{Dialect, IndexedReader, KeyedRecord, OffsetIndex, Page, PageRequest, Record};
pub use state::{CacheEntry, CacheStore, MemoryCacheStore, RedbCacheStore};
pub use utils::{AppConfig, CsvReaderError, ReaderConfig, Result};
