//! Page-of-results envelope shared by every paginated query.

use serde::{Deserialize, Serialize};

/// One page of results plus the number of the last page.
///
/// Pages are 1-indexed. Serialized as `{ "data": [...], "totalPages": n }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    /// A page with no items.
    #[must_use]
    pub const fn empty(total_pages: u32) -> Self {
        Self {
            data: Vec::new(),
            total_pages,
        }
    }

    /// Transform every item, keeping the page count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total_pages: self.total_pages,
        }
    }
}

/// Number of pages needed to show `total` items `limit` at a time.
///
/// A zero `limit` is treated as one item per page.
#[must_use]
pub fn total_pages(total: u64, limit: u32) -> u32 {
    let limit = u64::from(limit.max(1));
    u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX)
}

/// Row offset of the first item on `page` (1-indexed; page 0 is treated as 1).
#[must_use]
pub fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}
