//! Page-number pagination: `?page=N&limit=M`, answered with
//! `{count, next, previous, results}`.

use axum::http::{StatusCode, Uri};
use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::ServerError;
use crate::AppConfig;

pub(crate) const DEFAULT_PAGE_SIZE: i64 = 6;
pub(crate) const MAX_PAGE_SIZE: i64 = 100;

/// Raw pagination parameters. Kept as strings so junk values get the same
/// treatment as out-of-range ones instead of a deserialization error.
#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Paginator {
    page: i64,
    limit: i64,
    count: i64,
}

impl PageParams {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l > 0)
            .map_or(DEFAULT_PAGE_SIZE, |l| l.min(MAX_PAGE_SIZE))
    }

    /// Resolves the requested page against `count` rows.
    ///
    /// An unparsable page or one past the end is a 404; an empty result set
    /// still has a first page.
    pub(crate) fn paginate(&self, count: i64) -> Result<Paginator, ServerError> {
        let limit = self.limit();
        let page = match self.page.as_deref() {
            None => 1,
            Some("last") => last_page(count, limit),
            Some(raw) => raw.parse::<i64>().map_err(|_| invalid_page())?,
        };

        if page < 1 || page > last_page(count, limit) {
            return Err(invalid_page());
        }

        Ok(Paginator { page, limit, count })
    }
}

fn last_page(count: i64, limit: i64) -> i64 {
    ((count + limit - 1) / limit).max(1)
}

fn invalid_page() -> ServerError {
    ServerError(
        color_eyre::eyre::eyre!("Invalid page."),
        StatusCode::NOT_FOUND,
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl Paginator {
    pub(crate) fn limit(&self) -> i64 {
        self.limit
    }

    pub(crate) fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Wraps `results` with links to the neighbouring pages of `uri`.
    pub(crate) fn page<T>(&self, results: Vec<T>, app: &AppConfig, uri: &Uri) -> Page<T> {
        let current = app.request_url(uri);

        let next = (self.page < last_page(self.count, self.limit))
            .then(|| page_link(&current, Some(self.page + 1)));
        let previous = match self.page {
            1 => None,
            2 => Some(page_link(&current, None)),
            page => Some(page_link(&current, Some(page - 1))),
        };

        Page {
            count: self.count,
            next,
            previous,
            results,
        }
    }
}

/// `current` with its `page` parameter replaced, or dropped for the first page.
fn page_link(current: &Url, page: Option<i64>) -> String {
    let kept: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = current.clone();
    url.set_query(None);

    if !kept.is_empty() || page.is_some() {
        let mut query = url.query_pairs_mut();
        query.extend_pairs(kept);
        if let Some(page) = page {
            query.append_pair("page", &page.to_string());
        }
    }

    url.into()
}
