//! Crawler module for fetching and processing pages
//!
//! This module contains the core crawling logic, including:
//! - The collector façade and its crawl policy
//! - The frontier queue and the rate limiter
//! - The dispatcher worker pool and the fetch capability
//! - Callback registration and HTML extraction

mod callbacks;
mod collector;
mod dispatcher;
mod extractor;
mod fetcher;
mod frontier;
mod limiter;
mod policy;
mod request;

pub use callbacks::{
    Callbacks, ErrorHandler, Handler, HtmlCallback, HtmlHandler, Phase, RejectionHandler,
    RequestHandler, ResponseHandler,
};
pub use collector::Collector;
pub use extractor::{extract, HtmlElement};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{CrawlTarget, Frontier};
pub use limiter::{LimitPermit, RateLimiter, RateRule};
pub use policy::{CollectorOptions, ConcurrencyMode, Policy, DEFAULT_PARALLELISM};
pub use request::{Context, Request, Response};
