use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvReaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to open file {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No checkpoint at or before row {0}")]
    NoSuchCheckpoint(usize),

    #[error("Cache entry is corrupt: {0}")]
    CacheCorrupt(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, CsvReaderError>;
