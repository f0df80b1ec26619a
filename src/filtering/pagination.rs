use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upper bound for both `page_size` and `limit`
pub const MAX_PAGE_SIZE: u64 = 200;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Default `limit` for the start/limit request shape
pub const DEFAULT_LIMIT: u64 = 30;
/// Largest offset a database driver will bind as a signed 64-bit integer
pub const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

fn clamp_size(value: Option<i64>, default: u64) -> u64 {
    value.map_or(default, |v| {
        u64::try_from(v).unwrap_or(0).clamp(1, MAX_PAGE_SIZE)
    })
}

/// A normalised page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    offset: u64,
    limit: u64,
}

impl Pagination {
    /// `page` defaults to 1 and is clamped to at least 1; `page_size` defaults
    /// to 20 and is clamped into `[1, 200]`
    #[must_use]
    pub fn from_page(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = u64::try_from(page.unwrap_or(1)).unwrap_or(0).max(1);
        let limit = clamp_size(page_size, DEFAULT_PAGE_SIZE);
        Self {
            page,
            offset: (page - 1).saturating_mul(limit).min(MAX_OFFSET),
            limit,
        }
    }

    /// `start` defaults to 0 and is clamped to at least 0; `limit` defaults to
    /// 30 and is clamped into `[1, 200]`
    #[must_use]
    pub fn from_range(start: Option<i64>, limit: Option<i64>) -> Self {
        let offset = u64::try_from(start.unwrap_or(0)).unwrap_or(0);
        let limit = clamp_size(limit, DEFAULT_LIMIT);
        Self {
            page: offset / limit + 1,
            offset,
            limit,
        }
    }

    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_page(None, None)
    }
}

/// Page metadata returned with every list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub pages: u64,
}

impl PageMeta {
    #[must_use]
    pub fn new(pagination: &Pagination, total: u64) -> Self {
        Self {
            page: pagination.page(),
            page_size: pagination.limit(),
            total,
            pages: total_pages(total, pagination.limit()),
        }
    }
}

/// `ceil(total / page_size)`; a zero page size counts as one page
#[must_use]
pub const fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        1
    } else {
        total.div_ceil(page_size)
    }
}
