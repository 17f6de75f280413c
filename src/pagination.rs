use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE - 1;

/// `?page=&limit=` page-number pagination.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1).min(MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l >= 1)
            .map(|l| l.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `path` is the route the links point back to, e.g. `/api/recipes`.
    pub fn new(path: &str, params: PageParams, count: i64, results: Vec<T>) -> Self {
        let page = params.page();
        let limit = params.limit();
        let link = |p: i64| format!("{}?page={}&limit={}", path, p, limit);

        let next = (page * limit < count).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let p = PageParams::default();
        assert_eq!((p.page(), p.limit(), p.offset()), (1, DEFAULT_PAGE_SIZE, 0));

        let p = PageParams { page: Some(0), limit: Some(1000) };
        assert_eq!((p.page(), p.limit()), (1, MAX_PAGE_SIZE));

        let p = PageParams { page: Some(3), limit: Some(10) };
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn links_follow_count() {
        let params = PageParams { page: Some(2), limit: Some(2) };
        let page = Page::new("/api/recipes", params, 5, vec![3, 4]);
        assert_eq!(page.next.as_deref(), Some("/api/recipes?page=3&limit=2"));
        assert_eq!(page.previous.as_deref(), Some("/api/recipes?page=1&limit=2"));

        let last = Page::new("/api/recipes", PageParams { page: Some(3), limit: Some(2) }, 5, vec![5]);
        assert!(last.next.is_none());

        let first = Page::<i32>::new("/api/users", PageParams::default(), 0, vec![]);
        assert!(first.next.is_none() && first.previous.is_none());
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let p = PageParams { page: Some(i64::MAX), limit: None };
        assert_eq!(p.page(), MAX_PAGE);
        assert!(p.offset() > 0);

        let p = PageParams { page: Some(i64::MAX), limit: Some(MAX_PAGE_SIZE) };
        let page = Page::<i32>::new("/api/recipes", p, 3, vec![]);
        assert!(page.next.is_none());
        assert_eq!(
            page.previous,
            Some(format!("/api/recipes?page={}&limit={}", MAX_PAGE - 1, MAX_PAGE_SIZE))
        );
    }
}
