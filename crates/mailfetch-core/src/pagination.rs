//! Page arithmetic over an ordered UID list.
//!
//! Pages are 1-based and always cut from the matched, sorted UID set so a
//! page boundary never depends on sequence numbers. Everything here is
//! pure: no I/O, no allocation beyond the returned values.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest allowed page size.
pub const MIN_PAGE_SIZE: u32 = 5;
/// Largest allowed page size.
pub const MAX_PAGE_SIZE: u32 = 20;
/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = MIN_PAGE_SIZE;

/// Requested page, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageQuery {
    page: u32,
    size: u32,
}

impl PageQuery {
    /// Creates a query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if `page` is 0 or `size` is outside
    /// `5..=20`.
    pub fn new(page: u32, size: u32) -> Result<Self> {
        if page == 0 {
            return Err(Error::InvalidQuery("page must be at least 1".to_string()));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) {
            return Err(Error::InvalidQuery(format!(
                "size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}, got {size}"
            )));
        }
        Ok(Self { page, size })
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Messages per page.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<'de> Deserialize<'de> for PageQuery {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            page: Option<u32>,
            size: Option<u32>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.page.unwrap_or(1), raw.size.unwrap_or(DEFAULT_PAGE_SIZE))
            .map_err(serde::de::Error::custom)
    }
}

/// Inclusive 1-based bounds of one page within `total` items.
///
/// `from == to == 0` when there is nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First index, 1-based.
    pub from: u32,
    /// Last index, inclusive.
    pub to: u32,
    /// The page lies beyond the last one.
    pub overflow: bool,
    /// There are no items at all.
    pub empty: bool,
}

impl PageRange {
    /// True when the range selects nothing.
    #[must_use]
    pub const fn is_blank(self) -> bool {
        self.empty || self.overflow
    }

    /// Number of items in the range.
    #[must_use]
    pub const fn count(self) -> u32 {
        if self.is_blank() {
            0
        } else {
            self.to - self.from + 1
        }
    }
}

/// Number of pages needed for `total` items.
#[must_use]
pub const fn page_count(total: u32, size: u32) -> u32 {
    total.div_ceil(size)
}

/// Computes which items page `page` of size `size` covers.
#[must_use]
pub const fn range(total: u32, page: u32, size: u32) -> PageRange {
    let pages = page_count(total, size);
    let empty = total == 0;
    let overflow = !empty && page > pages;
    if empty || overflow {
        return PageRange {
            from: 0,
            to: 0,
            overflow,
            empty,
        };
    }
    let from = (page - 1) * size + 1;
    let to = if page == pages { total } else { page * size };
    PageRange {
        from,
        to,
        overflow,
        empty,
    }
}

/// The slice of `ids` that page `query` covers, empty when out of range.
#[must_use]
pub fn slice_page<T>(ids: &[T], query: PageQuery) -> &[T] {
    let total = u32::try_from(ids.len()).unwrap_or(u32::MAX);
    let range = range(total, query.page, query.size);
    if range.is_blank() {
        return &[];
    }
    &ids[(range.from - 1) as usize..range.to as usize]
}

/// Page metadata returned alongside the messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Requested page.
    pub page: u32,
    /// Requested page size.
    pub per_size: u32,
    /// Messages on this page.
    pub count: u32,
    /// Messages in the mailbox.
    pub total: u32,
    /// Number of pages.
    pub pages: u32,
    /// The page lies beyond the last one.
    pub overflow: bool,
    /// Previous page, if there is one.
    pub prev_page: Option<u32>,
    /// Next page, if there is one.
    pub next_page: Option<u32>,
}

impl Pagination {
    /// Metadata for `query` over `total` items.
    #[must_use]
    pub const fn of(total: u32, query: PageQuery) -> Self {
        let PageQuery { page, size } = query;
        let range = range(total, page, size);
        let pages = page_count(total, size);
        let blank = range.is_blank();
        Self {
            page,
            per_size: size,
            count: range.count(),
            total,
            pages,
            overflow: range.overflow,
            prev_page: if !blank && page > 1 { Some(page - 1) } else { None },
            next_page: if !blank && page < pages { Some(page + 1) } else { None },
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn query(page: u32, size: u32) -> PageQuery {
        PageQuery::new(page, size).unwrap()
    }

    #[test]
    fn test_query_bounds() {
        assert_eq!(PageQuery::default(), query(1, 5));
        assert!(PageQuery::new(0, 5).is_err());
        assert!(PageQuery::new(1, 4).is_err());
        assert!(PageQuery::new(1, 21).is_err());
        assert!(PageQuery::new(7, 20).is_ok());
    }

    #[test]
    fn test_query_deserialize_validates() {
        let q: PageQuery = serde_json::from_str(r#"{"page":3}"#).unwrap();
        assert_eq!(q, query(3, 5));
        assert!(serde_json::from_str::<PageQuery>(r#"{"page":1,"size":50}"#).is_err());
    }

    #[test]
    fn test_range_middle_and_last_page() {
        assert_eq!(
            range(12, 2, 5),
            PageRange {
                from: 6,
                to: 10,
                overflow: false,
                empty: false
            }
        );
        assert_eq!(range(12, 3, 5).from, 11);
        assert_eq!(range(12, 3, 5).to, 12);
    }

    #[test]
    fn test_range_empty_mailbox() {
        for page in [1, 2, 100] {
            let r = range(0, page, 5);
            assert!(r.empty);
            assert!(!r.overflow);
            assert_eq!((r.from, r.to), (0, 0));
        }
    }

    #[test]
    fn test_range_overflow() {
        let r = range(4, 2, 5);
        assert!(r.overflow);
        assert!(!r.empty);
        assert_eq!((r.from, r.to), (0, 0));
    }

    #[test]
    fn test_slice_page() {
        let ids = [4, 3, 2, 1, 0, 9, 8];
        assert_eq!(slice_page(&ids, query(1, 5)), &[4, 3, 2, 1, 0]);
        assert_eq!(slice_page(&ids, query(2, 5)), &[9, 8]);
        assert!(slice_page(&ids, query(3, 5)).is_empty());
        assert!(slice_page::<u32>(&[], query(1, 5)).is_empty());
    }

    #[test]
    fn test_pagination_single_page() {
        assert_eq!(
            Pagination::of(4, query(1, 5)),
            Pagination {
                page: 1,
                per_size: 5,
                count: 4,
                total: 4,
                pages: 1,
                overflow: false,
                prev_page: None,
                next_page: None,
            }
        );
    }

    #[test]
    fn test_pagination_middle_page() {
        let p = Pagination::of(23, query(2, 10));
        assert_eq!(p.pages, 3);
        assert_eq!(p.count, 10);
        assert_eq!(p.prev_page, Some(1));
        assert_eq!(p.next_page, Some(3));
    }

    #[test]
    fn test_pagination_overflow_has_no_neighbours() {
        let p = Pagination::of(4, query(2, 5));
        assert!(p.overflow);
        assert_eq!(p.count, 0);
        assert_eq!(p.prev_page, None);
        assert_eq!(p.next_page, None);
    }

    #[test]
    fn test_pagination_json_shape() {
        let json = serde_json::to_value(Pagination::of(4, query(2, 5))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "page": 2,
                "perSize": 5,
                "count": 0,
                "total": 4,
                "pages": 1,
                "overflow": true,
                "prevPage": null,
                "nextPage": null
            })
        );
    }

    proptest! {
        #[test]
        fn prop_pagination_laws(total in 0u32..500, page in 1u32..60, size in 5u32..=20) {
            let p = Pagination::of(total, query(page, size));
            let r = range(total, page, size);

            prop_assert_eq!(p.pages, total.div_ceil(size));
            prop_assert_eq!(r.empty, total == 0);
            prop_assert_eq!(p.overflow, total > 0 && page > p.pages);

            let blank = r.empty || r.overflow;
            let expected_prev = (page > 1 && !blank).then(|| page - 1);
            let expected_next = (page < p.pages && !blank).then(|| page + 1);
            prop_assert_eq!(p.prev_page, expected_prev);
            prop_assert_eq!(p.next_page, expected_next);

            if blank {
                prop_assert_eq!((r.from, r.to, p.count), (0, 0, 0));
            } else {
                prop_assert_eq!(p.count, r.to - r.from + 1);
                prop_assert!(p.count >= 1 && p.count <= size);
                prop_assert!(r.to <= total);
            }
        }

        #[test]
        fn prop_pages_partition_ids(total in 0usize..120, size in 5u32..=20) {
            let ids: Vec<usize> = (0..total).collect();
            let mut seen = Vec::new();
            let mut page = 1;
            loop {
                let slice = slice_page(&ids, query(page, size));
                if slice.is_empty() {
                    break;
                }
                seen.extend_from_slice(slice);
                page += 1;
            }
            prop_assert_eq!(seen, ids);
        }
    }
}
