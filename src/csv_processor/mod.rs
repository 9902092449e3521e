pub mod index;
pub mod indexed;
pub mod pagination;
pub mod reader;

pub use index::{build_index, IndexBuild, OffsetIndex};
pub use indexed::{pair_with_headers, IndexedReader, KeyedRecord};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_LIMIT};
pub use reader::{detect_bom, file_exists, Dialect, Record, RecordParser, UTF8_BOM};
