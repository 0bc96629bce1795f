//! Per-domain rate limiting
//!
//! This module handles:
//! - Matching hosts against registered rules (first match wins)
//! - Enforcing a minimum delay plus random jitter between dispatches to the
//!   same host
//! - Optional per-rule parallelism caps
//!
//! Hosts that match no rule are never delayed.

use crate::state::HostState;
use crate::url::{extract_domain, glob_match, host_matches};
use crate::CollectorError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use url::Url;

/// Delay settings for hosts matching a glob
#[derive(Debug, Clone)]
pub struct RateRule {
    /// Host glob, or `host/path` glob when it contains a `/`
    pub domain_glob: String,

    /// Minimum time between dispatches to one host
    pub delay: Duration,

    /// Upper bound of the uniform random delay added on top
    pub random_delay: Duration,

    /// Maximum concurrent fetches across all hosts matching this rule
    pub parallelism: Option<usize>,
}

impl RateRule {
    pub fn new(domain_glob: impl Into<String>, delay: Duration, random_delay: Duration) -> Self {
        Self {
            domain_glob: domain_glob.into(),
            delay,
            random_delay,
            parallelism: None,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Checks whether this rule applies to a URL
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = extract_domain(url) else {
            return false;
        };

        if self.domain_glob.contains('/') {
            let target = format!("{}{}", host, url.path());
            glob_match(&self.domain_glob.to_ascii_lowercase(), &target)
        } else {
            host_matches(&self.domain_glob, &host)
        }
    }

    /// Draws the delay for the next dispatch
    fn next_delay(&self) -> Duration {
        if self.random_delay.is_zero() {
            return self.delay;
        }

        let upper = u64::try_from(self.random_delay.as_nanos()).unwrap_or(u64::MAX);
        let jitter = rand::rng().random_range(0..=upper);
        self.delay + Duration::from_nanos(jitter)
    }
}

struct ActiveRule {
    rule: RateRule,
    slots: Option<Arc<Semaphore>>,
}

/// Held by a worker for the duration of a fetch
///
/// Dropping it frees the rule's parallelism slot, if the rule has one.
#[derive(Debug)]
pub struct LimitPermit {
    _slot: Option<OwnedSemaphorePermit>,
}

/// Rate limiter shared by all workers
#[derive(Default)]
pub struct RateLimiter {
    rules: RwLock<Vec<ActiveRule>>,
    hosts: Mutex<HashMap<String, Arc<tokio::sync::Mutex<HostState>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule; earlier rules take precedence
    pub fn add_rule(&self, rule: RateRule) {
        let slots = rule
            .parallelism
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        self.rules
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(ActiveRule { rule, slots });
    }

    /// Returns the registered rules in order
    pub fn rules(&self) -> Vec<RateRule> {
        self.rules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|active| active.rule.clone())
            .collect()
    }

    /// Rejects rules that can never match or never dispatch
    pub fn validate(&self) -> Result<(), CollectorError> {
        for rule in self.rules() {
            if rule.domain_glob.trim().is_empty() {
                return Err(CollectorError::EngineFatal(
                    "rate rule domain glob cannot be empty".to_string(),
                ));
            }
            if rule.parallelism == Some(0) {
                return Err(CollectorError::EngineFatal(format!(
                    "rate rule '{}' has a parallelism of 0",
                    rule.domain_glob
                )));
            }
        }
        Ok(())
    }

    fn find_rule(&self, url: &Url) -> Option<(RateRule, Option<Arc<Semaphore>>)> {
        self.rules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|active| active.rule.matches(url))
            .map(|active| (active.rule.clone(), active.slots.clone()))
    }

    fn host_state(&self, host: &str) -> Arc<tokio::sync::Mutex<HostState>> {
        self.hosts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(host.to_string())
            .or_default()
            .clone()
    }

    /// Waits until a dispatch to this URL's host is allowed
    ///
    /// The per-host lock is held across the sleep, so concurrent workers
    /// aimed at the same host queue up and each observes the timestamp
    /// left by the one before it.
    pub async fn wait(&self, url: &Url) -> LimitPermit {
        let Some((rule, slots)) = self.find_rule(url) else {
            return LimitPermit { _slot: None };
        };

        let slot = match slots {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };

        let host = extract_domain(url).unwrap_or_default();
        let state = self.host_state(&host);
        let mut state = state.lock().await;

        let delay = rule.next_delay();
        if let Some(wait) = state.time_until_next_dispatch(delay, Instant::now()) {
            tracing::debug!("Rate limiting {} for {:?} (rule {})", host, wait, rule.domain_glob);
            tokio::time::sleep(wait).await;
        }

        state.record_dispatch(Instant::now());

        LimitPermit { _slot: slot }
    }

    /// Returns the dispatch count recorded for a host
    pub async fn dispatch_count(&self, host: &str) -> u32 {
        let state = self.host_state(host);
        let count = state.lock().await.dispatch_count;
        count
    }
}
