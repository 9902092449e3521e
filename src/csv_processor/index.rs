use crate::csv_processor::reader::RecordParser;
use crate::utils::{CsvReaderError, Result};
use std::collections::BTreeMap;
use std::io::{Read, Seek};

/// Sparse map from row ordinals to the byte offset just past that row.
///
/// Row 0 maps to the first data row. Every other key is a multiple of the
/// checkpoint interval. Keys and offsets both increase strictly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetIndex {
    interval: usize,
    checkpoints: BTreeMap<usize, u64>,
}

/// Result of one full forward pass over the file.
#[derive(Debug, Clone)]
pub struct IndexBuild {
    pub index: OffsetIndex,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub first_row_offset: u64,
}

impl OffsetIndex {
    fn new(interval: usize, first_row_offset: u64) -> Self {
        let mut checkpoints = BTreeMap::new();
        checkpoints.insert(0, first_row_offset);
        Self {
            interval,
            checkpoints,
        }
    }

    /// Rebuilds an index from persisted checkpoints, rejecting anything that
    /// could not have come out of [`build_index`].
    pub fn from_checkpoints(interval: usize, entries: &[(usize, u64)]) -> Result<Self> {
        if interval == 0 {
            return Err(CsvReaderError::CacheCorrupt(
                "checkpoint interval is zero".to_string(),
            ));
        }
        match entries.first() {
            Some((0, _)) => {}
            _ => {
                return Err(CsvReaderError::CacheCorrupt(
                    "index has no entry for row 0".to_string(),
                ))
            }
        }

        for pair in entries.windows(2) {
            let (prev_row, prev_offset) = pair[0];
            let (row, offset) = pair[1];
            if row <= prev_row || offset <= prev_offset || row % interval != 0 {
                return Err(CsvReaderError::CacheCorrupt(format!(
                    "checkpoint {} -> {} does not follow {} -> {}",
                    row, offset, prev_row, prev_offset
                )));
            }
        }

        Ok(Self {
            interval,
            checkpoints: entries.iter().copied().collect(),
        })
    }

    /// Finds the greatest checkpoint at or below `target` rounded down to the interval.
    pub fn lookup_checkpoint(&self, target: usize) -> Option<(usize, u64)> {
        let aligned = (target / self.interval) * self.interval;
        self.checkpoints
            .range(..=aligned)
            .next_back()
            .map(|(row, offset)| (*row, *offset))
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn first_row_offset(&self) -> u64 {
        self.checkpoints.get(&0).copied().unwrap_or_default()
    }

    /// Number of stored checkpoints, row 0 included. Never zero.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn entries(&self) -> Vec<(usize, u64)> {
        self.checkpoints
            .iter()
            .map(|(row, offset)| (*row, *offset))
            .collect()
    }
}

/// Scans every remaining record once, collecting the header, the row count
/// and a checkpoint every `interval` rows.
///
/// The parser is expected to sit at the start of the file's content (past any
/// byte-order marker) and is left at end of stream.
pub fn build_index<R: Read + Seek>(
    parser: &mut RecordParser<R>,
    has_header: bool,
    interval: usize,
) -> Result<IndexBuild> {
    if interval == 0 {
        return Err(CsvReaderError::InvalidConfig(
            "checkpoint_interval must be greater than zero".to_string(),
        ));
    }

    let mut headers = Vec::new();
    if has_header {
        if let Some(row) = parser.next_record() {
            headers = row.iter().map(|h| h.trim().to_string()).collect();
        }
    }

    let first_row_offset = parser.position();
    let mut index = OffsetIndex::new(interval, first_row_offset);

    let mut count = 0usize;
    while let Some(row) = parser.next_record() {
        count += 1;

        if count == 1 && !has_header {
            headers = (1..=row.len()).map(|i| format!("col_{}", i)).collect();
        }

        if count % interval == 0 {
            index.checkpoints.insert(count, parser.position());
        }
    }

    Ok(IndexBuild {
        index,
        headers,
        row_count: count,
        first_row_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_processor::reader::Dialect;
    use std::io::Cursor;

    fn build(data: &str, has_header: bool, interval: usize) -> IndexBuild {
        let mut parser = RecordParser::new(Cursor::new(data.as_bytes().to_vec()), &Dialect::default());
        build_index(&mut parser, has_header, interval).expect("build")
    }

    fn numbered_rows(n: usize) -> String {
        let mut data = String::from("id,name\n");
        for i in 0..n {
            data.push_str(&format!("{},row{}\n", i, i));
        }
        data
    }

    #[test]
    fn header_is_trimmed_and_rows_counted() {
        let built = build(" id , name\n1,a\n2,b\n", true, 100);
        assert_eq!(built.headers, vec!["id", "name"]);
        assert_eq!(built.row_count, 2);
        assert_eq!(built.index.entries(), vec![(0, built.first_row_offset)]);
        assert!(built.first_row_offset > 0);
    }

    #[test]
    fn headers_are_synthesized_from_first_row() {
        let built = build("a,b,c\n1,2\n", false, 100);
        assert_eq!(built.headers, vec!["col_1", "col_2", "col_3"]);
        assert_eq!(built.row_count, 2);
        assert_eq!(built.first_row_offset, 0);
    }

    #[test]
    fn checkpoints_land_on_interval_multiples() {
        let built = build(&numbered_rows(25), true, 10);
        let rows: Vec<usize> = built.index.entries().iter().map(|(r, _)| *r).collect();
        assert_eq!(rows, vec![0, 10, 20]);
        assert_eq!(built.row_count, 25);

        let offsets: Vec<u64> = built.index.entries().iter().map(|(_, o)| *o).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_and_header_only_files_keep_row_zero() {
        let empty = build("", true, 100);
        assert_eq!(empty.row_count, 0);
        assert!(empty.headers.is_empty());
        assert_eq!(empty.index.entries(), vec![(0, 0)]);

        let header_only = build("a,b\n", true, 100);
        assert_eq!(header_only.row_count, 0);
        assert_eq!(header_only.headers, vec!["a", "b"]);
        assert_eq!(header_only.index.checkpoint_count(), 1);
    }

    #[test]
    fn lookup_rounds_down_to_checkpoint() {
        let built = build(&numbered_rows(35), true, 10);
        let index = &built.index;
        assert_eq!(index.lookup_checkpoint(0).map(|c| c.0), Some(0));
        assert_eq!(index.lookup_checkpoint(9).map(|c| c.0), Some(0));
        assert_eq!(index.lookup_checkpoint(10).map(|c| c.0), Some(10));
        assert_eq!(index.lookup_checkpoint(29).map(|c| c.0), Some(20));
        assert_eq!(index.lookup_checkpoint(500).map(|c| c.0), Some(30));
    }

    #[test]
    fn restored_index_matches_built_index() {
        let built = build(&numbered_rows(35), true, 10);
        let restored =
            OffsetIndex::from_checkpoints(10, &built.index.entries()).expect("restore");
        assert_eq!(restored, built.index);
    }

    #[test]
    fn restore_rejects_inconsistent_checkpoints() {
        assert!(OffsetIndex::from_checkpoints(10, &[]).is_err());
        assert!(OffsetIndex::from_checkpoints(10, &[(10, 40)]).is_err());
        assert!(OffsetIndex::from_checkpoints(10, &[(0, 8), (10, 4)]).is_err());
        assert!(OffsetIndex::from_checkpoints(10, &[(0, 8), (15, 90)]).is_err());
        assert!(OffsetIndex::from_checkpoints(0, &[(0, 8)]).is_err());
    }
}
