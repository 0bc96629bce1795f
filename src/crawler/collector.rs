//! Collector façade - policy enforcement and run lifecycle
//!
//! The collector owns everything a crawl session shares:
//! - The crawl policy (domain lists, depth ceiling, concurrency mode)
//! - The frontier and its visited set
//! - The rate limiter
//! - The callback registry, frozen when the run starts
//! - The cancellation token and worker handles

use crate::crawler::callbacks::{Callbacks, Handler, Phase, RejectionHandler};
use crate::crawler::dispatcher;
use crate::crawler::extractor::HtmlElement;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::limiter::{RateLimiter, RateRule};
use crate::crawler::policy::{CollectorOptions, ConcurrencyMode, Policy};
use crate::crawler::request::{Request, Response};
use crate::output::{CrawlStats, StatsRecorder};
use crate::state::{Lifecycle, TargetState};
use crate::url::{extract_domain, normalize_url, parse_target_url, strip_fragment};
use crate::{CollectorError, UrlError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

/// State shared between the collector, its workers, and callback views
pub(crate) struct Shared {
    pub(crate) policy: RwLock<Policy>,
    pub(crate) options: CollectorOptions,
    pub(crate) frontier: Frontier,
    pub(crate) limiter: RateLimiter,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) cancel: CancellationToken,
    pub(crate) stats: StatsRecorder,
    registry: Mutex<Callbacks>,
    frozen: OnceLock<Arc<Callbacks>>,
    started: AtomicBool,
    finished: watch::Sender<bool>,
}

/// Main crawler entry point
///
/// Cloning a collector yields another handle to the same session.
///
/// # Example
///
/// ```no_run
/// use ripple_collector::{Collector, ConcurrencyMode, HttpFetcher, Policy};
/// use ripple_collector::config::UserAgentConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::from_config(&UserAgentConfig::default())?;
/// let collector = Collector::new(fetcher);
/// collector.set_policy(
///     Policy::new()
///         .allowed_domains(["go-colly.org"])
///         .max_depth(2)
///         .mode(ConcurrencyMode::asynchronous()),
/// )?;
///
/// collector.on_html("a[href]", |e| {
///     if let Some(href) = e.attr("href") {
///         let _ = e.visit(href);
///     }
/// })?;
/// collector.on_html("title", |e| println!("{}", e.text()))?;
///
/// collector.visit("https://go-colly.org/")?;
/// collector.run().await?;
/// let stats = collector.wait().await?;
/// println!("{} pages scraped", stats.scraped);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Collector {
    shared: Arc<Shared>,
}

impl Collector {
    /// Creates a collector with default options and an unrestricted policy
    pub fn new(fetcher: impl Fetcher + 'static) -> Self {
        Self::with_options(fetcher, CollectorOptions::default())
    }

    pub fn with_options(fetcher: impl Fetcher + 'static, options: CollectorOptions) -> Self {
        let cancel = CancellationToken::new();

        Self {
            shared: Arc::new(Shared {
                policy: RwLock::new(Policy::default()),
                options,
                frontier: Frontier::new(cancel.clone()),
                limiter: RateLimiter::new(),
                fetcher: Arc::new(fetcher),
                cancel,
                stats: StatsRecorder::new(),
                registry: Mutex::new(Callbacks::new()),
                frozen: OnceLock::new(),
                started: AtomicBool::new(false),
                finished: watch::Sender::new(false),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    fn ensure_not_started(&self) -> Result<(), CollectorError> {
        if self.shared.started.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        Ok(())
    }

    /// Returns a copy of the current policy
    pub fn policy(&self) -> Policy {
        self.shared
            .policy
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replaces the crawl policy; only allowed before `run()`
    pub fn set_policy(&self, policy: Policy) -> Result<(), CollectorError> {
        self.ensure_not_started()?;
        *self
            .shared
            .policy
            .write()
            .unwrap_or_else(|e| e.into_inner()) = policy;
        Ok(())
    }

    /// Registers a rate rule; only allowed before `run()`
    pub fn add_rate_rule(
        &self,
        domain_glob: &str,
        delay: Duration,
        random_delay: Duration,
    ) -> Result<(), CollectorError> {
        self.limit(RateRule::new(domain_glob, delay, random_delay))
    }

    /// Registers a fully specified rate rule; only allowed before `run()`
    pub fn limit(&self, rule: RateRule) -> Result<(), CollectorError> {
        self.ensure_not_started()?;
        self.shared.limiter.add_rule(rule);
        Ok(())
    }

    /// Appends a handler to a phase; only allowed before `run()`
    pub fn register_callback(
        &self,
        phase: Phase,
        selector: Option<&str>,
        handler: Handler,
    ) -> Result<(), CollectorError> {
        self.ensure_not_started()?;
        self.shared
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .register(phase, selector, handler)
    }

    /// Fires before every fetch; handlers may set headers or abort
    pub fn on_request(
        &self,
        f: impl Fn(&mut Request) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.register_callback(Phase::Request, None, Handler::request(f))
    }

    /// Fires when a fetch fails with a transport or status error
    pub fn on_error(
        &self,
        f: impl Fn(&Request, &CollectorError) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.register_callback(Phase::Error, None, Handler::error(f))
    }

    /// Fires after every successful fetch
    pub fn on_response(
        &self,
        f: impl Fn(&Response) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.register_callback(Phase::Response, None, Handler::response(f))
    }

    /// Fires once per element matching `selector`
    pub fn on_html(
        &self,
        selector: &str,
        f: impl Fn(&HtmlElement<'_>) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.register_callback(Phase::Html, Some(selector), Handler::html(f))
    }

    /// Fires last for every successful fetch, after all HTML handlers
    pub fn on_scraped(
        &self,
        f: impl Fn(&Response) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.register_callback(Phase::Scraped, None, Handler::scraped(f))
    }

    /// Fires when `visit` drops a URL because of the domain or depth policy
    pub fn on_rejected(
        &self,
        f: impl Fn(&CollectorError) + Send + Sync + 'static,
    ) -> Result<(), CollectorError> {
        self.ensure_not_started()?;
        let handler: RejectionHandler = Arc::new(f);
        self.shared
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .add_rejected(handler);
        Ok(())
    }

    /// Enqueues a seed URL at depth 0
    ///
    /// Returns `Ok(true)` if the URL was newly enqueued and `Ok(false)` if
    /// it was already seen this session.
    pub fn visit(&self, url: &str) -> Result<bool, CollectorError> {
        self.visit_from(url, 0, None)
    }

    /// Enqueues a batch of seeds, skipping the ones that cannot be crawled
    ///
    /// Invalid URLs and policy rejections are logged at warn level and do
    /// not stop the remaining seeds. Returns how many seeds were newly
    /// enqueued.
    pub fn visit_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> usize {
        let mut enqueued = 0;

        for seed in seeds {
            let seed = seed.as_ref();
            match self.visit(seed) {
                Ok(true) => enqueued += 1,
                Ok(false) => tracing::debug!("Duplicate seed: {}", seed),
                Err(e) if e.is_rejection() || matches!(e, CollectorError::InvalidUrl(_)) => {
                    tracing::warn!("Skipping seed {}: {}", seed, e);
                }
                Err(e) => tracing::warn!("Failed to enqueue seed {}: {}", seed, e),
            }
        }

        enqueued
    }

    /// Enqueues an absolute URL at an explicit depth
    pub fn visit_from(
        &self,
        url: &str,
        depth: u32,
        origin: Option<&Url>,
    ) -> Result<bool, CollectorError> {
        let url = parse_target_url(url)?;
        let host = extract_domain(&url).ok_or(UrlError::MissingDomain)?;

        let policy = self.policy();

        if !policy.allows_host(&host) {
            return Err(self.reject(
                TargetState::DomainRejected,
                CollectorError::DomainRejected {
                    url: url.to_string(),
                    host,
                },
            ));
        }

        if let Some(max_depth) = policy.max_depth.filter(|_| !policy.allows_depth(depth)) {
            return Err(self.reject(
                TargetState::DepthExceeded,
                CollectorError::DepthExceeded {
                    url: url.to_string(),
                    depth,
                    max_depth,
                },
            ));
        }

        let key = normalize_url(url.as_str())?.to_string();
        let target = CrawlTarget {
            url: strip_fragment(&url),
            depth,
            origin: origin.cloned(),
            key,
        };

        let added = self.shared.frontier.enqueue(target);
        if added {
            self.shared.stats.record_enqueued();
            tracing::debug!("Enqueued {} at depth {}", url, depth);
        } else {
            tracing::trace!("Already visited: {}", url);
        }

        Ok(added)
    }

    /// Moves a never-enqueued target straight into its rejection state
    fn reject(&self, state: TargetState, error: CollectorError) -> CollectorError {
        tracing::debug!("Rejected: {}", error);
        if let Err(e) = Lifecycle::new().advance(state) {
            tracing::error!("{}", e);
        }
        self.shared.stats.record_outcome(state);

        // Cloned out so a handler can call `visit` without re-locking the registry
        let handlers = match self.shared.frozen.get() {
            Some(callbacks) => callbacks.rejection_handlers(),
            None => self
                .shared
                .registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .rejection_handlers(),
        };
        for handler in handlers {
            handler(&error);
        }

        error
    }

    /// Starts the workers
    ///
    /// Configuration contradictions fail with `EngineFatal` before anything
    /// is dispatched. In synchronous mode this returns once the crawl has
    /// finished; in asynchronous mode it returns immediately and
    /// [`Collector::wait`] blocks until the crawl is done.
    pub async fn run(&self) -> Result<(), CollectorError> {
        let policy = self.policy();
        policy.validate()?;
        self.shared.limiter.validate()?;

        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }

        let callbacks = {
            let mut registry = self
                .shared
                .registry
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            Arc::new(std::mem::take(&mut *registry))
        };
        let callbacks = self.shared.frozen.get_or_init(|| callbacks).clone();

        let workers = policy.mode.workers();
        tracing::info!(
            "Starting crawl with {} worker(s), {} target(s) queued",
            workers,
            self.shared.frontier.len()
        );

        let handles = dispatcher::spawn_workers(self.clone(), callbacks, workers);
        let shared = self.shared.clone();
        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Worker task failed: {}", e);
                }
            }
            shared.finished.send_replace(true);
        });

        match policy.mode {
            ConcurrencyMode::Synchronous => self.wait().await.map(|_| ()),
            ConcurrencyMode::Asynchronous { .. } => Ok(()),
        }
    }

    /// Waits until the frontier is drained and all in-flight targets finished
    ///
    /// Any number of callers may wait concurrently; all of them resolve once
    /// the last worker has exited. Before `run()` this returns immediately.
    pub async fn wait(&self) -> Result<CrawlStats, CollectorError> {
        if self.shared.started.load(Ordering::SeqCst) {
            let mut finished = self.shared.finished.subscribe();
            if finished.wait_for(|done| *done).await.is_err() {
                return Err(CollectorError::EngineFatal(
                    "worker supervisor dropped before finishing".to_string(),
                ));
            }
        }

        let stats = self.stats();
        tracing::info!(
            "Crawl finished: {} scraped, {} failed, {} rejected",
            stats.scraped,
            stats.failed,
            stats.rejected
        );
        Ok(stats)
    }

    /// Stops the crawl
    ///
    /// Waiting workers exit without dispatching further targets; in-flight
    /// fetches get the configured grace period before being dropped.
    pub fn cancel(&self) {
        tracing::info!("Cancelling crawl");
        self.shared.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Returns a snapshot of the run counters
    pub fn stats(&self) -> CrawlStats {
        self.shared.stats.snapshot()
    }

    /// Returns every normalized URL enqueued this session
    pub fn visited(&self) -> Vec<String> {
        self.shared.frontier.visited()
    }

    /// Returns the targets still waiting in the frontier
    pub fn pending_targets(&self) -> Vec<CrawlTarget> {
        self.shared.frontier.pending()
    }

    /// Registered rate rules, in precedence order
    pub fn rate_rules(&self) -> Vec<RateRule> {
        self.shared.limiter.rules()
    }
}

#[cfg(test)]
impl Collector {
    /// A collector whose fetcher always fails, for tests that never run
    pub(crate) fn detached() -> Self {
        use crate::crawler::fetcher::{FetchError, FetchedPage};
        use async_trait::async_trait;
        use reqwest::header::HeaderMap;

        struct Unreachable;

        #[async_trait]
        impl Fetcher for Unreachable {
            async fn fetch(&self, _: &Url, _: &HeaderMap) -> Result<FetchedPage, FetchError> {
                Err(FetchError::Other("detached collector".to_string()))
            }
        }

        Self::new(Unreachable)
    }
}
