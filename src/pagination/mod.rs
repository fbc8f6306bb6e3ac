use serde::Serialize;

/// Visible slice of a filtered list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

/// Clamps `requested` into `[1, total_pages]` and computes slice bounds.
/// A zero page size is treated as one.
pub fn paginate(total: usize, page_size: usize, requested: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size).max(1);
    let page = requested.clamp(1, total_pages);
    let start = ((page - 1) * page_size).min(total);
    let end = (start + page_size).min(total);
    PageWindow {
        page,
        total_pages,
        start,
        end,
        total,
    }
}

impl PageWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// "3 of 5", or "0 of 0" for an empty list.
    pub fn label(&self) -> String {
        if self.total == 0 {
            return "0 of 0".to_string();
        }
        format!("{} of {}", self.page, self.total_pages)
    }

    /// "9-16 of 18", or "0-0 of 0" for an empty list.
    pub fn range_label(&self) -> String {
        let first = if self.total > 0 { self.start + 1 } else { 0 };
        format!("{}-{} of {}", first, self.end, self.total)
    }

    pub fn pages(&self) -> Vec<usize> {
        if self.total == 0 {
            return Vec::new();
        }
        (1..=self.total_pages).collect()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
