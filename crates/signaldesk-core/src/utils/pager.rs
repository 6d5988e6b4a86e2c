//! Client-side paging over an already fetched list.

use std::ops::Range;

/// Default rows per page
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// A window of `page_size` rows sliding over `len` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    len: usize,
    page_size: usize,
    start: usize,
}

impl Pager {
    /// A zero page size falls back to the default.
    pub fn new(len: usize, page_size: usize) -> Self {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        Self {
            len,
            page_size,
            start: 0,
        }
    }

    /// Rows currently shown
    pub fn visible(&self) -> Range<usize> {
        self.start.min(self.len)..(self.start + self.page_size).min(self.len)
    }

    /// Prev/next controls are only worth showing when there is more than
    /// one page.
    pub fn has_controls(&self) -> bool {
        self.len > self.page_size
    }

    /// Advance one page unless the current page already reaches the end.
    pub fn next(&mut self) -> bool {
        if self.start + self.page_size < self.len {
            self.start += self.page_size;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.start > 0 {
            self.start = self.start.saturating_sub(self.page_size);
            true
        } else {
            false
        }
    }

    /// 1-based page number and page count
    pub fn position(&self) -> (usize, usize) {
        let pages = self.len.div_ceil(self.page_size).max(1);
        (self.start / self.page_size + 1, pages)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.visible();
        &items[range.start.min(items.len())..range.end.min(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_has_no_controls() {
        let pager = Pager::new(15, 15);
        assert!(!pager.has_controls());
        assert_eq!(pager.visible(), 0..15);
        assert_eq!(pager.position(), (1, 1));
    }

    #[test]
    fn test_next_and_prev_stop_at_ends() {
        let mut pager = Pager::new(32, 15);
        assert!(pager.has_controls());

        assert!(!pager.prev());
        assert!(pager.next());
        assert_eq!(pager.visible(), 15..30);
        assert!(pager.next());
        assert_eq!(pager.visible(), 30..32);
        assert_eq!(pager.position(), (3, 3));
        assert!(!pager.next());
        assert_eq!(pager.visible(), 30..32);

        assert!(pager.prev());
        assert!(pager.prev());
        assert_eq!(pager.visible(), 0..15);
        assert!(!pager.prev());
    }

    #[test]
    fn test_empty_list() {
        let mut pager = Pager::new(0, 15);
        assert_eq!(pager.visible(), 0..0);
        assert!(!pager.next());
        assert_eq!(pager.position(), (1, 1));
    }

    #[test]
    fn test_slice_and_zero_page_size() {
        let items: Vec<u32> = (0..20).collect();
        let mut pager = Pager::new(items.len(), 0);
        assert_eq!(pager.slice(&items).len(), DEFAULT_PAGE_SIZE);
        pager.next();
        assert_eq!(pager.slice(&items), &[15, 16, 17, 18, 19]);
    }
}
