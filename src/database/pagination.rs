use serde::{Deserialize, Serialize};

use crate::{constants::MAX_COUNT_PER_PAGE, error::ActionError};

/// 1-based page number and page size taken from `page` / `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_COUNT_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if rows.len() <= 0 {
            return Self::no_rows(total_rows, request);
        }

        let next = if request.offset() + (rows.len() as i64) < total_rows {
            Some(request.page + 1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous: Self::previous_page(request),
            results: rows,
        }
    }

    /// Like [`Page::from_rows`], but a page past the last one is not found.
    /// The total comes from `COUNT(*) OVER()`, which yields nothing there.
    pub fn try_from_rows(
        rows: Vec<T>,
        total_rows: i64,
        request: PageRequest,
    ) -> Result<Self, ActionError> {
        if rows.is_empty() && request.page > 1 {
            return Err(ActionError::NotFound(format!(
                "Page {} does not exist",
                request.page
            )));
        }
        Ok(Self::from_rows(rows, total_rows, request))
    }

    pub fn no_rows(total_rows: i64, request: PageRequest) -> Self {
        Self {
            count: total_rows,
            next: None,
            previous: Self::previous_page(request),
            results: vec![],
        }
    }

    fn previous_page(request: PageRequest) -> Option<i64> {
        (request.page > 1).then(|| request.page - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
