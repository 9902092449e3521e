use crate::csv_processor::indexed::{IndexedReader, KeyedRecord};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
    /// Rows skipped before the first page starts.
    pub offset: usize,
    /// Number given to the first record on page 1. May be zero or negative.
    pub start_count: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            start_count: 1,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            limit: if self.limit == 0 {
                DEFAULT_PAGE_LIMIT
            } else {
                self.limit
            },
            ..*self
        }
    }

    /// Data rows to skip to reach the first row of this page.
    pub fn skip(&self) -> usize {
        let req = self.normalized();
        (req.page - 1)
            .saturating_mul(req.limit)
            .saturating_add(req.offset)
    }
}

/// One window of rows plus the counts a renderer needs to paginate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub headers: Vec<String>,
    pub rows: Vec<KeyedRecord>,
    pub total_records: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub limit: usize,
    pub record_from: i64,
    pub record_to: i64,
}

impl Page {
    pub fn records_on_page(&self) -> usize {
        self.rows.len().min(self.limit)
    }

    pub fn is_paginated(&self) -> bool {
        self.total_records > self.limit
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Display number of the `i`-th row on this page.
    pub fn absolute_index(&self, i: usize) -> i64 {
        self.record_from.saturating_add(as_count(i))
    }
}

impl IndexedReader {
    pub fn page(&mut self, request: &PageRequest) -> Page {
        let req = request.normalized();
        let rows = self.get_keyed_rows(req.skip(), req.limit);

        let total_records = self.row_count().saturating_sub(req.offset);
        let total_pages = total_records.div_ceil(req.limit);
        let record_from = as_count(req.limit.saturating_mul(req.page - 1))
            .saturating_add(req.start_count);

        let mut page = Page {
            headers: self.headers().to_vec(),
            rows,
            total_records,
            total_pages,
            current_page: req.page,
            limit: req.limit,
            record_from,
            record_to: record_from,
        };
        page.record_to = record_from
            .saturating_add(as_count(page.records_on_page()))
            .saturating_sub(1);
        page
    }
}

fn as_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
