//! Crawl policy: domain lists, depth ceiling and concurrency mode

use crate::url::host_matches;
use crate::CollectorError;
use std::time::Duration;

/// Default number of workers in asynchronous mode
pub const DEFAULT_PARALLELISM: usize = 4;

/// How many workers drain the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// A single worker; `run()` returns once the crawl is finished
    #[default]
    Synchronous,

    /// A bounded pool; `run()` returns immediately and `wait()` blocks
    Asynchronous { parallelism: usize },
}

impl ConcurrencyMode {
    pub fn asynchronous() -> Self {
        Self::Asynchronous {
            parallelism: DEFAULT_PARALLELISM,
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Self::Synchronous => 1,
            Self::Asynchronous { parallelism } => *parallelism,
        }
    }
}

/// Domain and depth policy applied before a target is enqueued
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Host patterns that may be crawled; empty means unrestricted
    pub allowed_domains: Vec<String>,

    /// Host patterns that are never crawled, checked before the allow-list
    pub disallowed_domains: Vec<String>,

    /// Deepest depth that may be dispatched; None means unbounded
    pub max_depth: Option<u32>,

    pub mode: ConcurrencyMode,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn disallowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks a lowercase host against the domain lists
    pub fn allows_host(&self, host: &str) -> bool {
        if self
            .disallowed_domains
            .iter()
            .any(|pattern| host_matches(pattern, host))
        {
            return false;
        }

        self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|pattern| host_matches(pattern, host))
    }

    /// Checks a depth against the ceiling
    pub fn allows_depth(&self, depth: u32) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }

    /// Rejects contradictory settings before a run starts
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.mode.workers() == 0 {
            return Err(CollectorError::EngineFatal(
                "asynchronous mode needs a parallelism of at least 1".to_string(),
            ));
        }

        for pattern in self.allowed_domains.iter().chain(&self.disallowed_domains) {
            if pattern.trim().is_empty() {
                return Err(CollectorError::EngineFatal(
                    "domain patterns cannot be empty".to_string(),
                ));
            }
        }

        if let Some(conflict) = self.allowed_domains.iter().find(|allowed| {
            self.disallowed_domains
                .iter()
                .any(|denied| denied.eq_ignore_ascii_case(allowed))
        }) {
            return Err(CollectorError::EngineFatal(format!(
                "domain '{}' is both allowed and disallowed",
                conflict
            )));
        }

        Ok(())
    }
}

/// Runtime knobs that are not part of the crawl policy
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Per-target fetch timeout
    pub request_timeout: Duration,

    /// How long in-flight fetches may drain after `cancel()`
    pub cancel_grace: Duration,

    /// Route non-2xx responses through the success path instead of `on_error`
    pub parse_http_errors: bool,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cancel_grace: Duration::from_secs(2),
            parse_http_errors: false,
        }
    }
}
