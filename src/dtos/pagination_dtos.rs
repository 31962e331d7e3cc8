use std::collections::BTreeMap;

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";

/// `?limit=&offset=`. Kept as strings so garbage values fall back instead of
/// failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct LimitOffsetQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl LimitOffsetQuery {
    /// Positive limit, or `None` when the list should not be paginated.
    pub fn limit(&self) -> Option<i64> {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v > 0)
    }

    pub fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v >= 0)
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Absolute URL of the current request, used to build page links.
#[derive(Debug, Clone)]
pub struct PageUrl {
    base: String,
    params: BTreeMap<String, Vec<String>>,
}

impl PageUrl {
    pub fn new(base: impl Into<String>, query_string: &str) -> Self {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in query_string.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.entry(decode(key)).or_default().push(decode(value));
        }
        Self {
            base: base.into(),
            params,
        }
    }

    pub fn from_request(req: &HttpRequest) -> Self {
        let info = req.connection_info();
        let base = format!("{}://{}{}", info.scheme(), info.host(), req.path());
        Self::new(base, req.query_string())
    }

    fn replace(mut self, key: &str, value: i64) -> Self {
        self.params.insert(key.to_string(), vec![value.to_string()]);
        self
    }

    fn remove(mut self, key: &str) -> Self {
        self.params.remove(key);
        self
    }

    fn build(&self) -> String {
        let query: Vec<String> = self
            .params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
                })
            })
            .collect();
        if query.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{}", self.base, query.join("&"))
        }
    }

    pub fn next_link(&self, limit: i64, offset: i64, count: i64) -> Option<String> {
        let next_offset = offset.saturating_add(limit);
        if next_offset >= count {
            return None;
        }
        Some(
            self.clone()
                .replace(LIMIT_PARAM, limit)
                .replace(OFFSET_PARAM, next_offset)
                .build(),
        )
    }

    pub fn previous_link(&self, limit: i64, offset: i64) -> Option<String> {
        if offset <= 0 {
            return None;
        }
        let url = self.clone().replace(LIMIT_PARAM, limit);
        let previous_offset = offset.saturating_sub(limit);
        if previous_offset <= 0 {
            return Some(url.remove(OFFSET_PARAM).build());
        }
        Some(url.replace(OFFSET_PARAM, previous_offset).build())
    }
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.clone())
}

impl<T: Serialize> Page<T> {
    pub fn new(url: &PageUrl, limit: i64, offset: i64, count: i64, results: Vec<T>) -> Self {
        Page {
            count,
            next: url.next_link(limit, offset, count),
            previous: url.previous_link(limit, offset),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>) -> LimitOffsetQuery {
        LimitOffsetQuery {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
    }

    #[test]
    fn invalid_limit_disables_pagination() {
        assert_eq!(query(None, None).limit(), None);
        assert_eq!(query(Some("0"), None).limit(), None);
        assert_eq!(query(Some("abc"), None).limit(), None);
        assert_eq!(query(Some("5"), None).limit(), Some(5));
    }

    #[test]
    fn invalid_offset_means_zero() {
        assert_eq!(query(None, Some("-3")).offset(), 0);
        assert_eq!(query(None, Some("x")).offset(), 0);
        assert_eq!(query(None, Some("7")).offset(), 7);
    }

    #[test]
    fn links_in_the_middle_of_a_list() {
        let url = PageUrl::new("http://testserver/api/v1/posts/", "offset=4&limit=2");
        assert_eq!(
            url.next_link(2, 4, 10).as_deref(),
            Some("http://testserver/api/v1/posts/?limit=2&offset=6")
        );
        assert_eq!(
            url.previous_link(2, 4).as_deref(),
            Some("http://testserver/api/v1/posts/?limit=2&offset=2")
        );
    }

    #[test]
    fn first_and_last_page_links() {
        let url = PageUrl::new("http://testserver/api/v1/posts/", "limit=2&offset=2");
        assert_eq!(
            url.previous_link(2, 2).as_deref(),
            Some("http://testserver/api/v1/posts/?limit=2")
        );
        assert_eq!(url.next_link(2, 2, 4), None);
        assert_eq!(url.previous_link(2, 0), None);
    }

    #[test]
    fn huge_limit_and_offset_do_not_overflow() {
        let url = PageUrl::new("http://h/p/", "limit=9223372036854775807&offset=1");
        assert_eq!(url.next_link(i64::MAX, 1, 1), None);
        assert_eq!(url.next_link(i64::MAX, i64::MAX, 1), None);
        assert_eq!(url.previous_link(i64::MAX, 1).as_deref(), Some("http://h/p/?limit=9223372036854775807"));
        assert_eq!(
            url.previous_link(1, i64::MAX).as_deref(),
            Some("http://h/p/?limit=1&offset=9223372036854775806")
        );
    }

    #[test]
    fn other_params_are_kept() {
        let url = PageUrl::new("http://h/p/", "search=a%20b&limit=1");
        assert_eq!(
            url.next_link(1, 0, 3).as_deref(),
            Some("http://h/p/?limit=1&offset=1&search=a%20b")
        );
    }
}
