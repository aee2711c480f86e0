//! Client-side pagination over the in-memory buffer.

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Slice one page out of an ordered sequence.
///
/// Pages are 1-based. Pure and side-effect free; out-of-range input yields
/// an empty slice rather than clamping (callers clamp via [`PageCursor`]).
pub fn page<T>(records: &[T], page_size: usize, page: usize) -> &[T] {
    if page_size == 0 || page == 0 {
        return &[];
    }
    let Some(start) = (page - 1).checked_mul(page_size) else {
        return &[];
    };
    if start >= records.len() {
        return &[];
    }
    let end = (start + page_size).min(records.len());
    &records[start..end]
}

/// Pagination cursor owned by the controller.
///
/// `page` is kept within `[1, total_pages]` by the mutating methods; the
/// cursor is reset to page 1 on every historical fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    page_size: usize,
    page: usize,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total pages for a buffer of `len` records, never less than 1
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize, len: usize) {
        self.page = page.clamp(1, self.total_pages(len));
    }

    pub fn set_page_size(&mut self, page_size: usize, len: usize) {
        self.page_size = page_size.max(1);
        self.clamp(len);
    }

    /// Re-clamp after the buffer shrank underneath the cursor
    pub fn clamp(&mut self, len: usize) {
        self.page = self.page.min(self.total_pages(len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_slice_the_expected_ranges() {
        let records: Vec<usize> = (1..=120).collect();
        let cursor = PageCursor::new(50);

        assert_eq!(cursor.total_pages(records.len()), 3);
        assert_eq!(page(&records, 50, 1), (1..=50).collect::<Vec<_>>());
        assert_eq!(page(&records, 50, 3), (101..=120).collect::<Vec<_>>());
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let records: Vec<usize> = (1..=10).collect();
        assert!(page(&records, 50, 2).is_empty());
        assert!(page(&records, 50, 0).is_empty());
        assert!(page::<usize>(&[], 50, 1).is_empty());
    }

    #[test]
    fn cursor_clamps_after_shrink() {
        let mut cursor = PageCursor::new(50);
        cursor.set_page(3, 120);
        assert_eq!(cursor.page(), 3);

        // Buffer replaced by a smaller result set
        cursor.clamp(10);
        assert_eq!(cursor.page(), 1);
    }

    #[test]
    fn empty_buffer_still_has_one_page() {
        let cursor = PageCursor::new(50);
        assert_eq!(cursor.total_pages(0), 1);
    }

    #[test]
    fn page_size_has_a_floor_of_one() {
        let mut cursor = PageCursor::new(0);
        assert_eq!(cursor.page_size(), 1);
        cursor.set_page_size(0, 10);
        assert_eq!(cursor.page_size(), 1);
    }
}
