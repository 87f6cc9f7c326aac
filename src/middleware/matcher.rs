//! Decides which requests go through the security-header injector.
//!
//! A request is skipped when:
//! - its path (after the leading `/`) starts with an excluded prefix
//!   (`api`, `_next/static`, `_next/image`, `favicon.ico` by default), or
//! - it is a router prefetch (`next-router-prefetch` present, or `purpose: prefetch`).
//!
//! Prefixes are matched on raw text, so `api` also covers `/apiary`.

use axum::http::{HeaderMap, HeaderName, Request};

use crate::config::DEFAULT_EXCLUDED_PATHS;

const NEXT_ROUTER_PREFETCH: HeaderName = HeaderName::from_static("next-router-prefetch");
const PURPOSE: HeaderName = HeaderName::from_static("purpose");

#[derive(Debug, Clone)]
pub struct RequestMatcher {
    excluded_prefixes: Vec<String>,
}

impl RequestMatcher {
    pub fn new<I, S>(excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let excluded_prefixes = excluded_prefixes
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim_start_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { excluded_prefixes }
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matches_path(req.uri().path()) && !is_prefetch(req.headers())
    }

    pub fn matches_path(&self, path: &str) -> bool {
        let rest = path.strip_prefix('/').unwrap_or(path);
        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| rest.starts_with(prefix.as_str()))
    }
}

impl Default for RequestMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PATHS)
    }
}

fn is_prefetch(headers: &HeaderMap) -> bool {
    headers.contains_key(NEXT_ROUTER_PREFETCH)
        || headers
            .get_all(PURPOSE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.trim().eq_ignore_ascii_case("prefetch"))
}
