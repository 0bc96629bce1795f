//! Ripple-Collector: a domain-bounded crawling and scraping engine
//!
//! This crate implements a collector that fetches pages from seed URLs, runs
//! selector-bound extraction callbacks over each document, and follows the
//! links those callbacks discover, bounded by a domain allow-list, a depth
//! limit, and per-domain rate rules.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for collector operations
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Domain {host} is not allowed: {url}")]
    DomainRejected { url: String, host: String },

    #[error("Depth {depth} exceeds max depth {max_depth}: {url}")]
    DepthExceeded {
        url: String,
        depth: u32,
        max_depth: u32,
    },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: crawler::FetchError,
    },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Crawl cancelled while fetching {url}")]
    Cancelled { url: String },

    #[error("Handler fault while processing {url}: {message}")]
    HandlerFault { url: String, message: String },

    #[error("Engine configuration error: {0}")]
    EngineFatal(String),

    #[error("Invalid phase/selector combination: {0}")]
    InvalidPhaseSelector(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Collector is already running")]
    AlreadyRunning,

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TargetState,
        to: state::TargetState,
    },
}

impl CollectorError {
    /// Returns true for policy rejections (domain or depth)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::DomainRejected { .. } | Self::DepthExceeded { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Cannot resolve '{href}' against {base}")]
    Unresolvable { href: String, base: String },
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    Collector, CollectorOptions, Context, ConcurrencyMode, CrawlTarget, Fetcher, FetchedPage,
    Handler, HtmlElement, HttpFetcher, Phase, Policy, RateRule, Request, Response,
};
pub use output::CrawlStats;
pub use state::TargetState;
pub use url::{extract_domain, normalize_url};
