use crate::csv_processor::Dialect;
use crate::utils::errors::{CsvReaderError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reader: ReaderConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Everything an [`IndexedReader`](crate::IndexedReader) needs besides the file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub has_header: bool,
    pub use_cache: bool,
    #[serde(deserialize_with = "format_char")]
    pub delimiter: char,
    #[serde(deserialize_with = "format_char")]
    pub enclosure: char,
    #[serde(deserialize_with = "format_char")]
    pub escape: char,
    pub checkpoint_interval: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            use_cache: false,
            delimiter: ',',
            enclosure: '"',
            escape: '"',
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/csv_index_cache.redb"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ReaderConfig {
    pub fn tsv() -> Self {
        Self {
            delimiter: '\t',
            ..Self::default()
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the enclosure and, as RFC 4180 does, makes doubling the escape.
    pub fn with_enclosure(mut self, enclosure: char) -> Self {
        self.enclosure = enclosure;
        self.escape = enclosure;
        self
    }

    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    pub fn dialect(&self) -> Result<Dialect> {
        Dialect::from_chars(self.delimiter, self.enclosure, self.escape)
    }

    pub fn validate(&self) -> Result<Dialect> {
        if self.checkpoint_interval == 0 {
            return Err(CsvReaderError::InvalidConfig(
                "checkpoint_interval must be greater than zero".to_string(),
            ));
        }
        self.dialect()
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CsvReaderError::ConfigError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| CsvReaderError::ConfigError(e.to_string()))
    }

    pub fn load_or_default(path: Option<&str>) -> Self {
        if let Some(p) = path {
            Self::load_from_file(p).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

/// Parses a delimiter, enclosure or escape given as text.
///
/// Accepts a single character, or one of the written-out escapes `\t`, `\n`,
/// `\r` and `\r\n`. A written-out `\r\n` collapses to `\n`.
pub fn parse_format_char(value: &str) -> Result<char> {
    match value {
        "\\t" => return Ok('\t'),
        "\\n" | "\\r\\n" => return Ok('\n'),
        "\\r" => return Ok('\r'),
        _ => {}
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CsvReaderError::InvalidConfig(format!(
            "expected a single character, got {:?}",
            value
        ))),
    }
}

fn format_char<'de, D>(deserializer: D) -> std::result::Result<char, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_format_char(&value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_written_out_escapes() {
        assert_eq!(parse_format_char("\\t").expect("tab"), '\t');
        assert_eq!(parse_format_char("\\r\\n").expect("crlf"), '\n');
        assert_eq!(parse_format_char(";").expect("semicolon"), ';');
        assert_eq!(parse_format_char("\t").expect("literal tab"), '\t');
    }

    #[test]
    fn rejects_multi_character_values() {
        assert!(matches!(
            parse_format_char("||"),
            Err(CsvReaderError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_format_char(""),
            Err(CsvReaderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn toml_sections_fall_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [reader]
            has_header = false
            delimiter = "\\t"
            checkpoint_interval = 10
            "#,
        )
        .expect("parse");

        assert!(!config.reader.has_header);
        assert_eq!(config.reader.delimiter, '\t');
        assert_eq!(config.reader.enclosure, '"');
        assert_eq!(config.reader.checkpoint_interval, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn toml_rejects_long_delimiter() {
        let parsed: std::result::Result<AppConfig, _> = toml::from_str(
            r#"
            [reader]
            delimiter = "::"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_interval_is_invalid() {
        let config = ReaderConfig::default().with_checkpoint_interval(0);
        assert!(matches!(
            config.validate(),
            Err(CsvReaderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn with_enclosure_resets_escape() {
        let config = ReaderConfig::default().with_enclosure('\'');
        assert_eq!(config.escape, '\'');
        let dialect = config.validate().expect("valid");
        assert_eq!(dialect.enclosure, b'\'');
    }
}
