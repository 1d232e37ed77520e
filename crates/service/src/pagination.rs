//! Page window arithmetic for listing queries.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::pager::PagerView;

/// Inclusive row range `[from, to]` requested for one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub from: u64,
    pub to: u64,
}

impl PageWindow {
    /// Rows in the window; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Row window for a 1-based `page`. A page of 0 is treated as page 1.
pub fn compute_window(page: u32, limit: u32) -> Result<PageWindow, ServiceError> {
    if limit == 0 {
        return Err(ServiceError::InvalidArgument("limit must be positive".into()));
    }
    let page = u64::from(page.max(1));
    let limit = u64::from(limit);
    let from = (page - 1) * limit;
    Ok(PageWindow { from, to: from + limit - 1 })
}

/// `ceil(total_count / limit)`; zero rows means zero pages.
pub fn compute_total_pages(total_count: u64, limit: u32) -> Result<u32, ServiceError> {
    if limit == 0 {
        return Err(ServiceError::InvalidArgument("limit must be positive".into()));
    }
    let pages = total_count.div_ceil(u64::from(limit));
    u32::try_from(pages).map_err(|_| ServiceError::InvalidArgument("page count overflows".into()))
}

/// Pagination parameters as received from a caller.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: u32,
    /// items per page; `None` means the view's configured size
    #[serde(default, alias = "per_page")]
    pub limit: Option<u32>,
}

const MAX_LIMIT: u32 = 100;

fn default_page() -> u32 {
    1
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit: Some(limit) }
    }

    /// Page at least 1, limit capped at 100. A zero limit is passed through
    /// so [`compute_window`] rejects it.
    pub fn normalize(self, default_limit: u32) -> (u32, u32) {
        let page = self.page.max(1);
        let limit = self.limit.unwrap_or(default_limit).min(MAX_LIMIT);
        (page, limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: None }
    }
}

/// One page of a listing plus the totals the pager needs.
#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u32,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn pager(&self) -> Option<PagerView> {
        PagerView::new(self.page, self.total_pages)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            total_pages: self.total_pages,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_for_third_page_of_eight() {
        let w = compute_window(3, 8).unwrap();
        assert_eq!(w, PageWindow { from: 16, to: 23 });
        assert_eq!(w.len(), 8);
    }

    #[test]
    fn window_spans_exactly_limit_rows() {
        for page in 1..=20u32 {
            for limit in 1..=15u32 {
                let w = compute_window(page, limit).unwrap();
                assert_eq!(w.from, u64::from((page - 1) * limit));
                assert_eq!(w.to - w.from + 1, u64::from(limit));
            }
        }
    }

    #[test]
    fn page_zero_is_clamped_to_first_page() {
        assert_eq!(compute_window(0, 12).unwrap(), compute_window(1, 12).unwrap());
    }

    #[test]
    fn zero_limit_is_invalid_argument() {
        assert!(matches!(compute_window(1, 0), Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(compute_total_pages(10, 0), Err(ServiceError::InvalidArgument(_))));
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(compute_total_pages(17, 8).unwrap(), 3);
        assert_eq!(compute_total_pages(16, 8).unwrap(), 2);
        assert_eq!(compute_total_pages(1, 8).unwrap(), 1);
        assert_eq!(compute_total_pages(0, 8).unwrap(), 0);
    }

    #[test]
    fn normalize_caps_limit_but_keeps_zero() {
        assert_eq!(Pagination { page: 0, limit: Some(0) }.normalize(12), (1, 0));
        assert_eq!(Pagination { page: 5, limit: Some(1000) }.normalize(12), (5, 100));
        assert_eq!(Pagination::default().normalize(8), (1, 8));
    }
}
