pub mod config;
pub mod errors;

pub use config::{
    parse_format_char, AppConfig, CacheConfig, LoggingConfig, ReaderConfig,
    DEFAULT_CHECKPOINT_INTERVAL,
};
pub use errors::{CsvReaderError, Result};
