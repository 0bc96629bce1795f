use crate::crawler::{CollectorOptions, ConcurrencyMode, Policy, RateRule, DEFAULT_PARALLELISM};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for a collector run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// URLs enqueued at depth 0
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(rename = "limit", default)]
    pub limits: Vec<LimitEntry>,
    #[serde(rename = "extract", default)]
    pub extract: Vec<ExtractEntry>,
}

/// Collector behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Host patterns that may be visited; empty allows every host
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Host patterns that are never visited
    #[serde(rename = "disallowed-domains", default)]
    pub disallowed_domains: Vec<String>,

    /// Maximum link distance from a seed; unset means unbounded
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<i64>,

    /// Run workers in parallel instead of one at a time
    #[serde(rename = "async", default)]
    pub asynchronous: bool,

    /// Worker count in async mode
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Per-target fetch timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Drain period for in-flight fetches after cancellation (milliseconds)
    #[serde(rename = "cancel-grace-ms", default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,

    /// Pass non-2xx responses to the response callbacks
    #[serde(rename = "parse-http-errors", default)]
    pub parse_http_errors: bool,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_cancel_grace_ms() -> u64 {
    2_000
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            disallowed_domains: Vec::new(),
            max_depth: None,
            asynchronous: false,
            parallelism: None,
            request_timeout_ms: default_request_timeout_ms(),
            cancel_grace_ms: default_cancel_grace_ms(),
            parse_http_errors: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header, e.g. `Name/1.0 (+https://example.com/about)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Rate limit rule entry
#[derive(Debug, Clone, Deserialize)]
pub struct LimitEntry {
    /// Glob matched against the host (or host + path when it contains '/')
    #[serde(rename = "domain-glob")]
    pub domain_glob: String,

    /// Minimum spacing between dispatches to one host (milliseconds)
    #[serde(rename = "delay-ms", default)]
    pub delay_ms: u64,

    /// Upper bound of the random extra delay (milliseconds)
    #[serde(rename = "random-delay-ms", default)]
    pub random_delay_ms: u64,

    /// Concurrent fetches allowed for URLs matching this rule
    #[serde(default)]
    pub parallelism: Option<usize>,
}

/// Element to print while crawling
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractEntry {
    /// CSS selector to match
    pub selector: String,

    /// Attribute to print instead of the element text
    #[serde(default)]
    pub attr: Option<String>,

    /// Prefix for printed lines; defaults to the selector
    #[serde(default)]
    pub label: Option<String>,
}

impl ExtractEntry {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.selector)
    }
}

impl Config {
    /// Builds the crawl policy
    ///
    /// Expects a validated config; a negative max depth is rejected by
    /// validation and never reaches this point.
    pub fn policy(&self) -> Policy {
        let collector = &self.collector;

        let mode = if collector.asynchronous {
            ConcurrencyMode::Asynchronous {
                parallelism: collector.parallelism.unwrap_or(DEFAULT_PARALLELISM),
            }
        } else {
            ConcurrencyMode::Synchronous
        };

        let mut policy = Policy::new()
            .allowed_domains(collector.allowed_domains.iter())
            .disallowed_domains(collector.disallowed_domains.iter())
            .mode(mode);

        if let Some(depth) = collector.max_depth.and_then(|d| u32::try_from(d).ok()) {
            policy = policy.max_depth(depth);
        }

        policy
    }

    /// Converts the `[[limit]]` entries, preserving their order
    pub fn rate_rules(&self) -> Vec<RateRule> {
        self.limits
            .iter()
            .map(|entry| {
                let rule = RateRule::new(
                    entry.domain_glob.clone(),
                    Duration::from_millis(entry.delay_ms),
                    Duration::from_millis(entry.random_delay_ms),
                );
                match entry.parallelism {
                    Some(n) => rule.with_parallelism(n),
                    None => rule,
                }
            })
            .collect()
    }

    /// Runtime options for the collector
    pub fn options(&self) -> CollectorOptions {
        CollectorOptions {
            request_timeout: Duration::from_millis(self.collector.request_timeout_ms),
            cancel_grace: Duration::from_millis(self.collector.cancel_grace_ms),
            parse_http_errors: self.collector.parse_http_errors,
        }
    }
}
