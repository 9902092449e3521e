use crate::utils::{CsvReaderError, Result};
use csv::{ByteRecord, Position};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::warn;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// One logical row. Field contents are opaque text.
pub type Record = Vec<String>;

/// Byte-level delimiter, enclosure and escape characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub enclosure: u8,
    pub escape: u8,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            enclosure: b'"',
            escape: b'"',
        }
    }
}

impl Dialect {
    pub fn from_chars(delimiter: char, enclosure: char, escape: char) -> Result<Self> {
        Ok(Self {
            delimiter: single_byte("delimiter", delimiter)?,
            enclosure: single_byte("enclosure", enclosure)?,
            escape: single_byte("escape", escape)?,
        })
    }
}

fn single_byte(name: &str, value: char) -> Result<u8> {
    if value.is_ascii() {
        Ok(value as u8)
    } else {
        Err(CsvReaderError::InvalidConfig(format!(
            "{} must be a single-byte character, got {:?}",
            name, value
        )))
    }
}

/// Pulls records one at a time off a seekable byte stream.
///
/// Positions reported by [`RecordParser::position`] are absolute byte offsets
/// into the underlying stream and are always record boundaries, so they can be
/// handed back to [`RecordParser::seek`] later.
pub struct RecordParser<R> {
    reader: csv::Reader<EscapedEnclosures<R>>,
    record: ByteRecord,
}

impl<R: Read + Seek> RecordParser<R> {
    pub fn new(source: R, dialect: &Dialect) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(dialect.delimiter)
            .quote(dialect.enclosure)
            .double_quote(true)
            .from_reader(EscapedEnclosures::new(source, *dialect));

        Self {
            reader,
            record: ByteRecord::new(),
        }
    }

    /// Returns the next non-blank record, or `None` at end of stream.
    ///
    /// A read failure also ends the stream; it is logged, not returned.
    pub fn next_record(&mut self) -> Option<Record> {
        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(true) => {
                    if is_blank(&self.record) {
                        continue;
                    }
                    return Some(
                        self.record
                            .iter()
                            .map(|field| String::from_utf8_lossy(field).into_owned())
                            .collect(),
                    );
                }
                Ok(false) => return None,
                Err(e) => {
                    warn!(error = %e, byte = self.position(), "Stopped reading at unreadable record");
                    return None;
                }
            }
        }
    }

    pub fn position(&self) -> u64 {
        self.reader.position().byte()
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let mut pos = Position::new();
        pos.set_byte(offset);
        self.reader.seek(pos)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    FieldStart,
    Bare,
    Enclosed,
    AfterEnclosure,
}

/// Turns `escape, enclosure` inside an enclosed field into a doubled enclosure
/// before the csv reader sees it.
///
/// The rewrite is byte for byte, so offsets stay valid file offsets. An escape
/// followed by anything else is passed through together with that byte, and
/// both end up in the field. Seeks must land on record boundaries.
struct EscapedEnclosures<R> {
    inner: R,
    dialect: Dialect,
    state: Quoting,
    // Second byte of an escape pair, already read from `inner` but not yet handed out.
    carry: Option<u8>,
}

impl<R> EscapedEnclosures<R> {
    fn new(inner: R, dialect: Dialect) -> Self {
        Self {
            inner,
            dialect,
            state: Quoting::FieldStart,
            carry: None,
        }
    }

    fn advance(&mut self, byte: u8) {
        let Dialect {
            delimiter,
            enclosure,
            ..
        } = self.dialect;
        let ends_field = byte == delimiter || byte == b'\n' || byte == b'\r';

        self.state = match self.state {
            Quoting::FieldStart | Quoting::Bare if ends_field => Quoting::FieldStart,
            Quoting::FieldStart if byte == enclosure => Quoting::Enclosed,
            Quoting::FieldStart | Quoting::Bare => Quoting::Bare,
            Quoting::Enclosed if byte == enclosure => Quoting::AfterEnclosure,
            Quoting::Enclosed => Quoting::Enclosed,
            Quoting::AfterEnclosure if byte == enclosure => Quoting::Enclosed,
            Quoting::AfterEnclosure if ends_field => Quoting::FieldStart,
            Quoting::AfterEnclosure => Quoting::Bare,
        };
    }
}

impl<R: Read> EscapedEnclosures<R> {
    fn read_one(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for EscapedEnclosures<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Dialect {
            enclosure, escape, ..
        } = self.dialect;
        if escape == enclosure || buf.is_empty() {
            return self.inner.read(buf);
        }

        let start = usize::from(self.carry.is_some());
        let len = start + self.inner.read(&mut buf[start..])?;
        if let Some(byte) = self.carry.take() {
            buf[0] = byte;
        }

        let mut i = start;
        while i < len {
            let byte = buf[i];
            if self.state != Quoting::Enclosed || byte != escape {
                self.advance(byte);
                i += 1;
                continue;
            }

            let next = if i + 1 < len {
                Some(buf[i + 1])
            } else {
                let next = self.read_one()?;
                self.carry = next;
                next
            };
            if next == Some(enclosure) {
                buf[i] = enclosure;
            }
            i += 2;
        }
        Ok(len)
    }
}

impl<R: Seek> Seek for EscapedEnclosures<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.state = Quoting::FieldStart;
        self.carry = None;
        self.inner.seek(pos)
    }
}

// Only a lone empty field counts as blank; `,` yields two empty fields and is kept.
fn is_blank(record: &ByteRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

/// Returns the offset where data starts: 3 past a UTF-8 byte-order marker, else 0.
///
/// The stream is rewound to byte 0 afterwards. A `RecordParser` must start
/// over a stream at byte 0 for its positions to be absolute offsets.
pub fn detect_bom<R: Read + Seek>(source: &mut R) -> io::Result<u64> {
    let mut prefix = Vec::with_capacity(UTF8_BOM.len());
    (&mut *source)
        .take(UTF8_BOM.len() as u64)
        .read_to_end(&mut prefix)?;
    source.seek(SeekFrom::Start(0))?;

    if prefix == UTF8_BOM {
        Ok(UTF8_BOM.len() as u64)
    } else {
        Ok(0)
    }
}

pub fn file_exists(path: &Path) -> bool {
    path.exists()
}
