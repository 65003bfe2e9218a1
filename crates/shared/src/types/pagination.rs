//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Upper bound for `per_page` to keep list queries bounded.
pub const MAX_PER_PAGE: u32 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Returns a copy with `page >= 1` and `1 <= per_page <= MAX_PER_PAGE`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = if total == 0 || per_page == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
        };

        Self {
            data,
            meta: PageMeta {
                page,
                per_page,
                total,
                total_pages,
            },
        }
    }

    /// Maps the items of the page, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::default();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
        assert_eq!(req.offset(), 0);
        assert_eq!(req.limit(), 20);
    }

    #[rstest]
    #[case(1, 20, 0)]
    #[case(2, 20, 20)]
    #[case(5, 10, 40)]
    #[case(0, 10, 0)]
    fn test_offset(#[case] page: u32, #[case] per_page: u32, #[case] expected: u64) {
        let req = PageRequest { page, per_page };
        assert_eq!(req.offset(), expected);
    }

    #[test]
    fn test_normalized_clamps() {
        let req = PageRequest {
            page: 0,
            per_page: 10_000,
        }
        .normalized();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);
    }

    #[rstest]
    #[case(0, 20, 1)]
    #[case(20, 20, 1)]
    #[case(21, 20, 2)]
    #[case(101, 10, 11)]
    fn test_total_pages(#[case] total: u64, #[case] per_page: u32, #[case] expected: u32) {
        let page: PageResponse<()> = PageResponse::new(vec![], 1, per_page, total);
        assert_eq!(page.meta.total_pages, expected);
    }

    #[test]
    fn test_map_keeps_meta() {
        let page = PageResponse::new(vec![1, 2, 3], 1, 20, 3).map(|n| n * 2);
        assert_eq!(page.data, vec![2, 4, 6]);
        assert_eq!(page.meta.total, 3);
    }
}
