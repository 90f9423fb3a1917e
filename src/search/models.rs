//! Page result model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of transformed hits plus pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T = Value> {
    /// 1-based page number, 0 when no page size applies
    pub page: u64,
    pub page_size: u64,
    /// Number of matching documents
    pub total: u64,
    pub docs: Vec<T>,
    pub has_next_page: bool,
}

impl<T> PageResult<T> {
    /// Page of a bounded window starting at `skip`
    pub fn new(skip: u64, page_size: u64, total: u64, docs: Vec<T>) -> Self {
        let page = if page_size > 0 { skip / page_size + 1 } else { 0 };
        let total_pages = if page_size > 0 {
            total.div_ceil(page_size)
        } else {
            0
        };
        Self {
            page,
            page_size,
            total,
            docs,
            has_next_page: page < total_pages,
        }
    }

    /// Result of the streaming path: everything in one go
    pub fn streamed(docs: Vec<T>) -> Self {
        Self {
            page: 0,
            page_size: 0,
            total: docs.len() as u64,
            docs,
            has_next_page: false,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}
