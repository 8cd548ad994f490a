use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound on a single window so one request can't pull a whole table.
pub const MAX_LIMIT: u32 = 100;

/// Raw `page` / `limit` query parameters as they arrive on the wire.
///
/// Kept as strings so that garbage like `?page=abc` falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn to_request(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

/// A normalized, always-valid window request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Both values are clamped to at least 1; `limit` is also capped at [`MAX_LIMIT`].
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, u32::MAX as i64) as u32,
            limit: limit.clamp(1, MAX_LIMIT as i64) as u32,
        }
    }

    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = coerce(page).unwrap_or(DEFAULT_PAGE as i64);
        let limit = coerce(limit).unwrap_or(DEFAULT_LIMIT as i64);
        Self::new(page, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

fn coerce(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    // "2.0" and friends: truncate like a lenient integer cast would
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

/// One window of an ordered collection plus the counts needed to navigate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
}

impl<T> Page<T> {
    /// Wrap a window the store already cut with `LIMIT`/`OFFSET`.
    pub fn from_window(docs: Vec<T>, total_docs: u64, req: PageRequest) -> Self {
        let limit = req.limit as u64;
        let total_pages = total_docs.div_ceil(limit);
        let has_next_page = (req.page as u64) < total_pages;
        let has_prev_page = req.page > 1;

        Self {
            docs,
            total_docs,
            limit: req.limit,
            page: req.page,
            total_pages,
            has_next_page,
            has_prev_page,
            next_page: has_next_page.then(|| req.page + 1),
            prev_page: has_prev_page.then(|| req.page - 1),
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
            next_page: self.next_page,
            prev_page: self.prev_page,
        }
    }
}

/// Cut a window out of an already-ordered in-memory source.
pub fn paginate<T, I>(source: I, req: PageRequest) -> Page<T>
where
    I: IntoIterator<Item = T>,
{
    let mut total = 0u64;
    let offset = req.offset();
    let mut docs = Vec::with_capacity(req.limit as usize);

    for item in source {
        if total >= offset && docs.len() < req.limit as usize {
            docs.push(item);
        }
        total += 1;
    }

    Page::from_window(docs, total, req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_page_of_twenty_five() {
        let page = paginate(1..=25, PageRequest::new(2, 10));

        assert_eq!(page.docs, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total_docs, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.prev_page, Some(1));
    }

    #[test]
    fn last_partial_page() {
        let page = paginate(1..=25, PageRequest::new(3, 10));
        assert_eq!(page.docs, vec![21, 22, 23, 24, 25]);
        assert!(!page.has_next_page);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = paginate(1..=5, PageRequest::new(4, 10));
        assert!(page.docs.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
        assert!(page.has_prev_page);
    }

    #[test]
    fn empty_source() {
        let page = paginate(Vec::<u8>::new(), PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
        assert!(!page.has_prev_page);
    }

    #[test]
    fn raw_params_are_coerced() {
        assert_eq!(PageRequest::from_raw(None, None), PageRequest::new(1, 10));
        assert_eq!(PageRequest::from_raw(Some("0"), Some("-5")), PageRequest::new(1, 1));
        assert_eq!(PageRequest::from_raw(Some("abc"), Some("20")), PageRequest::new(1, 20));
        assert_eq!(PageRequest::from_raw(Some(" 3 "), Some("2.9")), PageRequest::new(3, 2));
        assert_eq!(PageRequest::from_raw(None, Some("5000")).limit(), MAX_LIMIT);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 7).offset(), 14);
    }
}
