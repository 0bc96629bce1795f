//! Frontier queue of pending crawl targets
//!
//! This module handles:
//! - FIFO ordering of pending targets (breadth-first traversal)
//! - Duplicate suppression on normalized URLs
//! - In-flight accounting so workers know when the crawl is finished
//! - Waking blocked workers on new work, completion, or cancellation

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A URL waiting to be dispatched
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    /// The URL to fetch (fragment removed)
    pub url: Url,

    /// Link distance from a seed
    pub depth: u32,

    /// Page the link was discovered on, if any
    pub origin: Option<Url>,

    /// Normalized form used for dedup
    pub key: String,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<CrawlTarget>,
    visited: HashSet<String>,
    in_flight: usize,
}

/// Shared FIFO of crawl targets with a visited set
///
/// Enqueueing is synchronous so extraction callbacks can push newly
/// discovered links without awaiting; dequeueing waits until either work
/// arrives or nothing is pending and nothing is in flight.
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    cancel: CancellationToken,
}

impl Frontier {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a target unless its key was seen before
    ///
    /// Returns true if the target was newly added.
    pub fn enqueue(&self, target: CrawlTarget) -> bool {
        {
            let mut state = self.lock();
            if !state.visited.insert(target.key.clone()) {
                return false;
            }
            state.pending.push_back(target);
        }

        self.notify.notify_waiters();
        true
    }

    /// Takes the next target, waiting while other workers may still add work
    ///
    /// Returns None once the queue is drained with nothing in flight, or
    /// when the crawl is cancelled. Every `Some` must be paired with a call
    /// to [`Frontier::complete`].
    pub async fn dequeue(&self) -> Option<CrawlTarget> {
        loop {
            // Registered before the state check so a wakeup between the
            // check and the await is not lost.
            let notified = self.notify.notified();

            {
                let mut state = self.lock();
                if self.cancel.is_cancelled() {
                    return None;
                }
                if let Some(target) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(target);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            tokio::select! {
                _ = notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Marks a dequeued target as finished
    pub fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }

        self.notify.notify_waiters();
    }

    /// Returns the number of pending targets
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Returns the number of targets currently being processed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Returns whether a normalized key was already enqueued
    pub fn is_visited(&self, key: &str) -> bool {
        self.lock().visited.contains(key)
    }

    /// Returns a snapshot of the pending targets in dequeue order
    pub fn pending(&self) -> Vec<CrawlTarget> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Returns a snapshot of all normalized keys seen this session
    pub fn visited(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().visited.iter().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn target(path: &str, depth: u32) -> CrawlTarget {
        let url = Url::parse(&format!("https://site.test{}", path)).unwrap();
        CrawlTarget {
            key: url.to_string(),
            url,
            depth,
            origin: None,
        }
    }

    #[test]
    fn test_enqueue_dedup() {
        let frontier = Frontier::new(CancellationToken::new());

        assert!(frontier.enqueue(target("/a", 0)));
        assert!(!frontier.enqueue(target("/a", 1)));
        assert!(frontier.enqueue(target("/b", 1)));

        assert_eq!(frontier.len(), 2);
        assert!(frontier.is_visited("https://site.test/a"));
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new(CancellationToken::new());
        frontier.enqueue(target("/a", 0));
        frontier.enqueue(target("/b", 1));
        frontier.enqueue(target("/c", 1));

        let mut order = Vec::new();
        while let Some(t) = frontier.dequeue().await {
            order.push(t.url.path().to_string());
            frontier.complete();
        }

        assert_eq!(order, vec!["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_empty_frontier_terminates() {
        let frontier = Frontier::new(CancellationToken::new());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_dequeued_target_stays_visited() {
        let frontier = Frontier::new(CancellationToken::new());
        frontier.enqueue(target("/a", 0));
        let _ = frontier.dequeue().await.unwrap();
        frontier.complete();

        assert!(!frontier.enqueue(target("/a", 0)));
    }

    #[tokio::test]
    async fn test_waits_for_in_flight_producer() {
        let frontier = Arc::new(Frontier::new(CancellationToken::new()));
        frontier.enqueue(target("/a", 0));

        let first = frontier.dequeue().await.unwrap();
        assert_eq!(frontier.in_flight(), 1);

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // The in-flight worker discovers a link, then completes
        frontier.enqueue(target("/b", first.depth + 1));
        frontier.complete();

        let next = waiter.await.unwrap().unwrap();
        assert_eq!(next.url.path(), "/b");
    }

    #[tokio::test]
    async fn test_waiter_released_when_last_worker_completes() {
        let frontier = Arc::new(Frontier::new(CancellationToken::new()));
        frontier.enqueue(target("/a", 0));
        let _ = frontier.dequeue().await.unwrap();

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.complete();

        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_unblocks_waiters() {
        let cancel = CancellationToken::new();
        let frontier = Arc::new(Frontier::new(cancel.clone()));
        frontier.enqueue(target("/a", 0));
        let _ = frontier.dequeue().await.unwrap();
        frontier.enqueue(target("/b", 1));

        cancel.cancel();

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue().await })
        };
        assert!(waiter.await.unwrap().is_none());
    }
}
