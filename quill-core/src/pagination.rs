//! Pagination types
//!
//! Listing fetches the page of rows and the total row count in one query
//! (`count(*) OVER()`); `PageMetadata::compute` turns that count into the
//! metadata returned with each page.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Highest accepted page number
pub const MAX_PAGE: u32 = 10_000_000;

/// Maximum items per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default items per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Validated page request
///
/// Only `new` and `default` build one, so `offset()` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Create a page request.
    ///
    /// - Page must be within 1..=10_000_000
    /// - Page size must be within 1..=100
    pub fn new(page: u32, page_size: u32) -> Result<Self, ValidationError> {
        if !(1..=MAX_PAGE).contains(&page) {
            return Err(ValidationError::OutOfRange {
                field: "page",
                min: 1,
                max: MAX_PAGE as u64,
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ValidationError::OutOfRange {
                field: "page_size",
                min: 1,
                max: MAX_PAGE_SIZE as u64,
            });
        }
        Ok(Self { page, page_size })
    }

    /// Page number (1-indexed)
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Items per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Metadata describing one page of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u64,
    pub total_records: u64,
}

impl PageMetadata {
    /// Derive metadata from the total row count.
    ///
    /// An empty table yields all-zero metadata. The current page is reported
    /// as requested, even when it lies past `last_page`.
    pub fn compute(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size as u64),
            total_records,
        }
    }
}

/// One page of results plus its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: PageMetadata,
}
