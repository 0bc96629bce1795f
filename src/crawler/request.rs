//! Request and response views handed to callbacks
//!
//! Both carry a handle back to the collector so callbacks can enqueue new
//! work with `visit`, but otherwise expose only read-only metadata (plus
//! headers and the abort flag while the request is still being prepared).

use crate::crawler::collector::Collector;
use crate::crawler::fetcher::FetchedPage;
use crate::crawler::frontier::CrawlTarget;
use crate::url::resolve_link;
use crate::{CollectorError, UrlError};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use url::Url;

/// Key/value store shared by all callbacks of one target
///
/// Values put during `on_request` are visible from `on_response`,
/// `on_html`, `on_scraped` and `on_error` for the same target.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

/// An outgoing request for a crawl target
#[derive(Clone)]
pub struct Request {
    url: Url,
    depth: u32,
    origin: Option<Url>,
    headers: HeaderMap,
    ctx: Context,
    aborted: bool,
    collector: Collector,
}

impl Request {
    pub(crate) fn new(target: CrawlTarget, collector: Collector) -> Self {
        Self {
            url: target.url,
            depth: target.depth,
            origin: target.origin,
            headers: HeaderMap::new(),
            ctx: Context::new(),
            aborted: false,
            collector,
        }
    }

    /// The URL being requested
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Link distance from a seed
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Page this URL was discovered on
    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a request header, ignoring names or values that are not valid HTTP
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                true
            }
            _ => false,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Cancels the fetch; only meaningful inside `on_request`
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Resolves a possibly relative link against this request's URL
    pub fn absolute_url(&self, href: &str) -> Option<Url> {
        resolve_link(href, &self.url)
    }

    /// Enqueues a link one level deeper than this request
    pub fn visit(&self, href: &str) -> Result<bool, CollectorError> {
        self.visit_relative_to(href, &self.url)
    }

    pub(crate) fn visit_relative_to(&self, href: &str, base: &Url) -> Result<bool, CollectorError> {
        let url = resolve_link(href, base).ok_or_else(|| UrlError::Unresolvable {
            href: href.to_string(),
            base: base.to_string(),
        })?;

        self.collector
            .visit_from(url.as_str(), self.depth + 1, Some(&self.url))
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url.as_str())
            .field("depth", &self.depth)
            .field("origin", &self.origin.as_ref().map(Url::as_str))
            .field("aborted", &self.aborted)
            .finish()
    }
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    final_url: Url,
    status: u16,
    headers: HeaderMap,
    body: String,
    fetched_at: DateTime<Utc>,
}

impl Response {
    pub(crate) fn new(request: Request, page: FetchedPage) -> Self {
        Self {
            request,
            final_url: page.final_url,
            status: page.status,
            headers: page.headers,
            body: page.body,
            fetched_at: Utc::now(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Final URL after redirects
    pub fn url(&self) -> &Url {
        &self.final_url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn ctx(&self) -> &Context {
        self.request.ctx()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Whether the body should be handed to HTML extraction
    ///
    /// A missing Content-Type is treated as HTML.
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("html"))
    }

    /// Resolves a possibly relative link against the final URL
    pub fn absolute_url(&self, href: &str) -> Option<Url> {
        resolve_link(href, &self.final_url)
    }

    /// Enqueues a link found in this document
    pub fn visit(&self, href: &str) -> Result<bool, CollectorError> {
        self.request.visit_relative_to(href, &self.final_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchedPage;

    fn request(collector: &Collector) -> Request {
        let url = Url::parse("https://site.test/docs/").unwrap();
        Request::new(
            CrawlTarget {
                key: url.to_string(),
                url,
                depth: 2,
                origin: None,
            },
            collector.clone(),
        )
    }

    fn page(content_type: Option<&'static str>) -> FetchedPage {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        FetchedPage {
            final_url: Url::parse("https://site.test/docs/index.html").unwrap(),
            status: 200,
            headers,
            body: "<html></html>".to_string(),
        }
    }

    #[test]
    fn test_context_shared_between_clones() {
        let ctx = Context::new();
        let other = ctx.clone();
        ctx.put("page", "docs");
        assert_eq!(other.get("page"), Some("docs".to_string()));
        assert_eq!(other.get("missing"), None);
    }

    #[test]
    fn test_set_header() {
        let collector = Collector::detached();
        let mut req = request(&collector);
        assert!(req.set_header("X-Trace", "abc"));
        assert!(!req.set_header("bad header", "abc"));
        assert_eq!(req.headers().get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_abort_flag() {
        let collector = Collector::detached();
        let mut req = request(&collector);
        assert!(!req.is_aborted());
        req.abort();
        assert!(req.is_aborted());
    }

    #[test]
    fn test_response_resolves_against_final_url() {
        let collector = Collector::detached();
        let response = Response::new(request(&collector), page(Some("text/html")));
        assert_eq!(
            response.absolute_url("other.html").unwrap().as_str(),
            "https://site.test/docs/other.html"
        );
        assert_eq!(response.request().url().as_str(), "https://site.test/docs/");
    }

    #[test]
    fn test_is_html() {
        let collector = Collector::detached();
        assert!(Response::new(request(&collector), page(Some("text/HTML"))).is_html());
        assert!(Response::new(request(&collector), page(None)).is_html());
        assert!(!Response::new(request(&collector), page(Some("application/json"))).is_html());
    }

    #[test]
    fn test_visit_uses_next_depth() {
        let collector = Collector::detached();
        let response = Response::new(request(&collector), page(Some("text/html")));

        assert!(response.visit("/next").unwrap());
        assert!(!response.visit("/next").unwrap());
        assert!(response.visit("mailto:x@site.test").is_err());

        let target = collector.pending_targets().pop().unwrap();
        assert_eq!(target.depth, 3);
        assert_eq!(target.origin.unwrap().as_str(), "https://site.test/docs/");
    }
}
