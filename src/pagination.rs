use std::ops::Range;

use tracing::trace;

/// Number of pages needed for `len` items. At least one page as soon as the
/// page size is valid, zero pages for a zero page size.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    std::cmp::max(1, len.div_ceil(page_size))
}

/// Index range of the 1-based `page` within `len` items. Pages past the end
/// produce an empty range, page 0 is read as page 1.
pub fn page_range(len: usize, page_size: usize, page: usize) -> Range<usize> {
    let page = std::cmp::max(page, 1);
    let begin = (page - 1).saturating_mul(page_size);
    if begin >= len {
        return len..len;
    }
    let end = std::cmp::min(begin.saturating_add(page_size), len);
    begin..end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Page(usize),
    Ellipsis,
}

/// Buttons shown in the pagination line. Small page counts list every page,
/// larger ones keep the first, the last and the neighbours of the current
/// page with ellipses in between.
pub fn page_buttons(current: usize, total: usize) -> Vec<PageButton> {
    let mut pages = Vec::new();
    if total <= 7 {
        pages.extend((1..=total).map(PageButton::Page));
    } else {
        pages.push(PageButton::Page(1));
        if current > 3 {
            pages.push(PageButton::Ellipsis);
        }
        let begin = std::cmp::max(2, current.saturating_sub(1));
        let end = std::cmp::min(current + 1, total - 1);
        pages.extend((begin..=end).map(PageButton::Page));
        if current + 2 < total {
            pages.push(PageButton::Ellipsis);
        }
        pages.push(PageButton::Page(total));
    }
    pages
}

/// Page an ellipsis button jumps to.
pub fn ellipsis_target(total: usize) -> usize {
    std::cmp::max(1, total.div_ceil(2))
}

/// Current page of a view. Always 1-based and never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    current: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Pager { current: 1 }
    }
}

impl Pager {
    pub fn current(&self) -> usize {
        self.current
    }

    /// Back to the first page, used whenever the result set changed.
    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// Jump to `page`, clamped into `1..=total`.
    pub fn goto(&mut self, page: usize, total: usize) {
        let last = std::cmp::max(total, 1);
        self.current = page.clamp(1, last);
        trace!("Goto page {} of {}", self.current, total);
    }

    pub fn next(&mut self, total: usize) -> bool {
        if self.current < total {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn first(&mut self) {
        self.current = 1;
    }

    pub fn last(&mut self, total: usize) {
        self.current = std::cmp::max(total, 1);
    }

    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.current < total
    }

    pub fn activate(&mut self, button: PageButton, total: usize) {
        match button {
            PageButton::Page(page) => self.goto(page, total),
            PageButton::Ellipsis => self.goto(ellipsis_target(total), total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageButton::{Ellipsis, Page};

    #[test]
    fn page_count_has_a_floor_of_one() {
        assert_eq!(page_count(0, 5), 1);
        assert_eq!(page_count(5, 5), 1);
        assert_eq!(page_count(6, 5), 2);
        assert_eq!(page_count(100, 10), 10);
        assert_eq!(page_count(3, 0), 0);
    }

    #[test]
    fn page_range_clips_and_tolerates_out_of_range() {
        assert_eq!(page_range(12, 5, 1), 0..5);
        assert_eq!(page_range(12, 5, 3), 10..12);
        assert_eq!(page_range(12, 5, 4), 12..12);
        assert_eq!(page_range(12, 5, 0), 0..5);
        assert_eq!(page_range(12, 0, 1), 0..0);
        assert_eq!(page_range(2, 1, 5), 2..2);
    }

    #[test]
    fn few_pages_are_listed_completely() {
        assert_eq!(
            page_buttons(1, 5),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5)]
        );
        assert!(page_buttons(1, 0).is_empty());
    }

    #[test]
    fn many_pages_are_elided() {
        assert_eq!(
            page_buttons(1, 20),
            vec![Page(1), Page(2), Ellipsis, Page(20)]
        );
        assert_eq!(
            page_buttons(10, 20),
            vec![Page(1), Ellipsis, Page(9), Page(10), Page(11), Ellipsis, Page(20)]
        );
        assert_eq!(
            page_buttons(20, 20),
            vec![Page(1), Ellipsis, Page(19), Page(20)]
        );
        assert_eq!(
            page_buttons(3, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn pager_stays_in_bounds() {
        let mut pager = Pager::default();
        assert!(!pager.prev());
        assert!(pager.next(2));
        assert!(!pager.next(2));
        assert_eq!(pager.current(), 2);

        pager.goto(9, 4);
        assert_eq!(pager.current(), 4);
        pager.goto(0, 4);
        assert_eq!(pager.current(), 1);

        pager.last(7);
        assert_eq!(pager.current(), 7);
        pager.reset();
        assert_eq!(pager.current(), 1);
    }

    #[test]
    fn ellipsis_jumps_to_the_middle() {
        let mut pager = Pager::default();
        pager.activate(Ellipsis, 9);
        assert_eq!(pager.current(), 5);
        pager.activate(Ellipsis, 20);
        assert_eq!(pager.current(), 10);
        pager.activate(Page(3), 20);
        assert_eq!(pager.current(), 3);
    }
}
