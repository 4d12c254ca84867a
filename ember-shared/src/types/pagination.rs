use serde::{Deserialize, Serialize};

/// Offset/limit window over a fully materialized, ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetParams {
    pub offset: usize,
    pub limit: usize,
}

impl OffsetParams {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Slices `items` and reports whether anything lies beyond the window.
    /// `total` is the size of the input, not of the page.
    pub fn apply<T>(&self, items: Vec<T>) -> OffsetPage<T> {
        let total = items.len();
        let has_more = self.offset.saturating_add(self.limit) < total;
        let items = items.into_iter().skip(self.offset).take(self.limit).collect();
        OffsetPage { items, has_more, total }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub total: usize,
}
