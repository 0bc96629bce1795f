//! Worker pool that drives targets through the per-document pipeline
//!
//! Each worker repeatedly takes a target from the frontier and runs
//! rate limit -> on_request -> fetch -> on_response/on_error -> extraction
//! -> on_scraped for it. Handler panics are contained per target.

use crate::crawler::callbacks::Callbacks;
use crate::crawler::collector::Collector;
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{FetchError, FetchedPage};
use crate::crawler::frontier::CrawlTarget;
use crate::crawler::policy::Policy;
use crate::crawler::request::{Request, Response};
use crate::state::{Lifecycle, TargetState};
use crate::url::extract_domain;
use crate::CollectorError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Spawns `count` workers over the collector's frontier
pub(crate) fn spawn_workers(
    collector: Collector,
    callbacks: Arc<Callbacks>,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let collector = collector.clone();
            let callbacks = callbacks.clone();
            tokio::spawn(async move { worker_loop(id, collector, callbacks).await })
        })
        .collect()
}

async fn worker_loop(id: usize, collector: Collector, callbacks: Arc<Callbacks>) {
    tracing::debug!("Worker {} started", id);
    let shared = collector.shared().clone();

    while let Some(target) = shared.frontier.dequeue().await {
        let url = target.url.to_string();

        let outcome = AssertUnwindSafe(process_target(&collector, &callbacks, target))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(state)) => shared.stats.record_outcome(state),
            Ok(Err(e)) => {
                tracing::error!("Pipeline error for {}: {}", url, e);
                shared.stats.record_outcome(TargetState::Failed);
            }
            Err(payload) => {
                let fault = CollectorError::HandlerFault {
                    url,
                    message: panic_message(payload.as_ref()),
                };
                tracing::warn!("{}", fault);
                shared.stats.record_fault();
            }
        }

        shared.frontier.complete();
    }

    tracing::debug!("Worker {} finished", id);
}

/// Runs one target to a terminal state
async fn process_target(
    collector: &Collector,
    callbacks: &Callbacks,
    target: CrawlTarget,
) -> Result<TargetState, CollectorError> {
    let shared = collector.shared();
    let mut lifecycle = Lifecycle::new();

    let _permit = tokio::select! {
        permit = shared.limiter.wait(&target.url) => permit,
        _ = shared.cancel.cancelled() => {
            tracing::debug!("Cancelled before dispatch: {}", target.url);
            return Ok(lifecycle.state());
        }
    };

    lifecycle.advance(TargetState::Dispatched)?;
    shared.stats.record_dispatched();

    let mut request = Request::new(target, collector.clone());
    callbacks.fire_request(&mut request);

    if request.is_aborted() {
        tracing::debug!("Request aborted by callback: {}", request.url());
        return lifecycle.advance(TargetState::Aborted);
    }

    lifecycle.advance(TargetState::Fetching)?;
    tracing::info!("Fetching {} (depth {})", request.url(), request.depth());

    let page = match fetch(collector, &request).await {
        Ok(page) => page,
        Err(error) => {
            tracing::warn!("{}", error);
            callbacks.fire_error(&request, &error);
            return lifecycle.advance(TargetState::Failed);
        }
    };

    // Redirects are followed beneath the fetcher, so the landing host is
    // checked against the domain policy here.
    if let Err(error) = check_final_host(&collector.policy(), &page) {
        tracing::warn!("Redirected off-policy from {}: {}", request.url(), error);
        callbacks.fire_error(&request, &error);
        return lifecycle.advance(TargetState::Failed);
    }

    if !page.is_success() && !shared.options.parse_http_errors {
        let error = CollectorError::HttpStatus {
            url: page.final_url.to_string(),
            status: page.status,
        };
        tracing::warn!("{}", error);
        callbacks.fire_error(&request, &error);
        return lifecycle.advance(TargetState::Failed);
    }

    lifecycle.advance(TargetState::Succeeded)?;
    let response = Response::new(request, page);
    tracing::debug!(
        "Fetched {} ({}, {} bytes)",
        response.url(),
        response.status(),
        response.body().len()
    );
    callbacks.fire_response(&response);

    lifecycle.advance(TargetState::Extracting)?;
    if response.is_html() {
        let matched = extract(&response, callbacks.html());
        tracing::debug!("{} element(s) matched on {}", matched, response.url());
    }
    callbacks.fire_scraped(&response);

    lifecycle.advance(TargetState::Scraped)
}

/// Fetches with the per-target timeout, giving up after the cancel grace period
async fn fetch(collector: &Collector, request: &Request) -> Result<FetchedPage, CollectorError> {
    let shared = collector.shared();
    let url = request.url();

    let attempt = tokio::time::timeout(
        shared.options.request_timeout,
        shared.fetcher.fetch(url, request.headers()),
    );
    let grace = async {
        shared.cancel.cancelled().await;
        tokio::time::sleep(shared.options.cancel_grace).await;
    };

    tokio::select! {
        result = attempt => match result {
            Ok(Ok(page)) => Ok(page),
            Ok(Err(FetchError::Timeout)) | Err(_) => Err(CollectorError::Timeout {
                url: url.to_string(),
            }),
            Ok(Err(source)) => Err(CollectorError::Transport {
                url: url.to_string(),
                source,
            }),
        },
        _ = grace => Err(CollectorError::Cancelled { url: url.to_string() }),
    }
}

/// Rejects pages whose post-redirect host falls outside the domain policy
fn check_final_host(policy: &Policy, page: &FetchedPage) -> Result<(), CollectorError> {
    let host = extract_domain(&page.final_url).unwrap_or_default();
    if policy.allows_host(&host) {
        return Ok(());
    }

    Err(CollectorError::DomainRejected {
        url: page.final_url.to_string(),
        host,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
