//! Bounded pager: which page buttons to show around the current page.

use serde::{Serialize, Serializer};

/// Pages shown on each side of the current page.
pub const PAGE_DELTA: u32 = 3;

pub const ELLIPSIS: &str = "…";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerEntry {
    Page(u32),
    /// Gap marker; never selectable.
    Ellipsis,
}

impl PagerEntry {
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}

impl Serialize for PagerEntry {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(n) => s.serialize_u32(*n),
            Self::Ellipsis => s.serialize_str(ELLIPSIS),
        }
    }
}

/// Entries for the pager. Empty when there is at most one page.
/// `current_page` is clamped into `1..=total_pages`.
pub fn page_numbers_to_show(current_page: u32, total_pages: u32, delta: u32) -> Vec<PagerEntry> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let current = current_page.clamp(1, total_pages);
    let range_start = current.saturating_sub(delta).max(1);
    let range_end = current.saturating_add(delta).min(total_pages);

    let mut entries = Vec::with_capacity((range_end - range_start + 3) as usize);
    if range_start > 1 {
        entries.push(PagerEntry::Ellipsis);
    }
    entries.extend((range_start..=range_end).map(PagerEntry::Page));
    if range_end < total_pages {
        entries.push(PagerEntry::Ellipsis);
    }
    entries
}

/// Navigation controls of the pager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagerControl {
    First,
    Prev,
    Next,
    Last,
    Entry(PagerEntry),
}

/// Everything a view needs to render the pager for one listing page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PagerView {
    pub current_page: u32,
    pub total_pages: u32,
    pub entries: Vec<PagerEntry>,
    pub first_disabled: bool,
    pub prev_disabled: bool,
    pub next_disabled: bool,
    pub last_disabled: bool,
}

impl PagerView {
    /// `None` when there is nothing to page through.
    pub fn new(current_page: u32, total_pages: u32) -> Option<Self> {
        if total_pages <= 1 {
            return None;
        }
        let current = current_page.clamp(1, total_pages);
        let at_start = current == 1;
        let at_end = current == total_pages;
        Some(Self {
            current_page: current,
            total_pages,
            entries: page_numbers_to_show(current, total_pages, PAGE_DELTA),
            first_disabled: at_start,
            prev_disabled: at_start,
            next_disabled: at_end,
            last_disabled: at_end,
        })
    }

    /// Page a control leads to, or `None` if the control is disabled or inert.
    pub fn target(&self, control: PagerControl) -> Option<u32> {
        match control {
            PagerControl::First if !self.first_disabled => Some(1),
            PagerControl::Prev if !self.prev_disabled => Some(self.current_page - 1),
            PagerControl::Next if !self.next_disabled => Some(self.current_page + 1),
            PagerControl::Last if !self.last_disabled => Some(self.total_pages),
            PagerControl::Entry(PagerEntry::Page(n)) => Some(n),
            _ => None,
        }
    }

    /// Invoke `on_page_change` with the control's target page, if any.
    /// Returns whether the callback ran.
    pub fn select(&self, control: PagerControl, on_page_change: impl FnOnce(u32)) -> bool {
        match self.target(control) {
            Some(page) => {
                on_page_change(page);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PagerEntry::{Ellipsis, Page};

    #[test]
    fn middle_page_has_both_ellipses() {
        assert_eq!(
            page_numbers_to_show(5, 10, 3),
            vec![Ellipsis, Page(2), Page(3), Page(4), Page(5), Page(6), Page(7), Page(8), Ellipsis]
        );
    }

    #[test]
    fn first_page_only_trailing_ellipsis() {
        assert_eq!(page_numbers_to_show(1, 5, 3), vec![Page(1), Page(2), Page(3), Page(4), Ellipsis]);
    }

    #[test]
    fn last_page_only_leading_ellipsis() {
        assert_eq!(page_numbers_to_show(5, 5, 3), vec![Ellipsis, Page(2), Page(3), Page(4), Page(5)]);
    }

    #[test]
    fn single_page_renders_nothing() {
        assert!(page_numbers_to_show(1, 1, 3).is_empty());
        assert!(page_numbers_to_show(7, 0, 3).is_empty());
        assert!(PagerView::new(1, 1).is_none());
    }

    #[test]
    fn out_of_range_current_is_clamped() {
        assert_eq!(page_numbers_to_show(99, 4, 3), page_numbers_to_show(4, 4, 3));
        assert_eq!(page_numbers_to_show(0, 4, 3), page_numbers_to_show(1, 4, 3));
    }

    #[test]
    fn numeric_entries_are_contiguous_and_in_range() {
        for total in 2..=15u32 {
            for current in 1..=total {
                let pages: Vec<u32> = page_numbers_to_show(current, total, PAGE_DELTA)
                    .into_iter()
                    .filter_map(|e| match e { Page(n) => Some(n), Ellipsis => None })
                    .collect();
                assert!(pages.windows(2).all(|w| w[1] == w[0] + 1));
                assert!(pages.contains(&current));
                assert!(*pages.first().unwrap() >= 1 && *pages.last().unwrap() <= total);
            }
        }
    }

    #[test]
    fn controls_disable_at_boundaries() {
        let first = PagerView::new(1, 3).unwrap();
        assert!(first.first_disabled && first.prev_disabled);
        assert!(!first.next_disabled && !first.last_disabled);

        let last = PagerView::new(3, 3).unwrap();
        assert!(last.next_disabled && last.last_disabled);
        assert_eq!(last.target(PagerControl::Prev), Some(2));
    }

    #[test]
    fn selecting_ellipsis_is_noop() {
        let view = PagerView::new(5, 10).unwrap();
        let mut hit = None;
        assert!(!view.select(PagerControl::Entry(Ellipsis), |p| hit = Some(p)));
        assert_eq!(hit, None);
        assert!(view.select(PagerControl::Entry(Page(7)), |p| hit = Some(p)));
        assert_eq!(hit, Some(7));
        assert!(view.select(PagerControl::Last, |p| hit = Some(p)));
        assert_eq!(hit, Some(10));
    }

    #[test]
    fn entries_serialize_as_numbers_and_marker() {
        let v = serde_json::to_value(page_numbers_to_show(1, 5, 3)).unwrap();
        assert_eq!(v, serde_json::json!([1, 2, 3, 4, "…"]));
    }
}
