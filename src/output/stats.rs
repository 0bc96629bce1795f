//! Run counters and their printed summary
//!
//! Workers bump atomic counters as targets reach terminal states; callers
//! read a consistent-enough [`CrawlStats`] snapshot at any time.

use crate::state::TargetState;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Crawl statistics summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Targets accepted into the frontier
    pub enqueued: u64,

    /// Targets that passed the rate limiter
    pub dispatched: u64,

    /// Documents whose callbacks all completed
    pub scraped: u64,

    /// Transport, timeout, status or cancellation failures
    pub failed: u64,

    /// Requests aborted from `on_request`
    pub aborted: u64,

    /// URLs dropped by the domain or depth policy
    pub rejected: u64,

    /// Targets abandoned because a handler panicked
    pub faults: u64,
}

impl CrawlStats {
    /// Targets that reached any terminal state after dispatch
    pub fn finished(&self) -> u64 {
        self.scraped + self.failed + self.aborted + self.faults
    }
}

/// Shared counters updated by the workers
#[derive(Debug, Default)]
pub struct StatsRecorder {
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    scraped: AtomicU64,
    failed: AtomicU64,
    aborted: AtomicU64,
    rejected: AtomicU64,
    faults: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a target by the state it finished in
    ///
    /// Non-terminal states (a target cancelled before dispatch) are ignored.
    pub fn record_outcome(&self, state: TargetState) {
        let counter = match state {
            TargetState::Scraped => &self.scraped,
            TargetState::Failed => &self.failed,
            TargetState::Aborted => &self.aborted,
            TargetState::DomainRejected | TargetState::DepthExceeded => &self.rejected,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            scraped: self.scraped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Enqueued: {}", stats.enqueued);
    println!("  Dispatched: {}", stats.dispatched);
    println!("  Rejected by policy: {}", stats.rejected);
    println!();

    println!("Outcomes:");
    let mut outcomes = [
        ("Scraped", stats.scraped),
        ("Failed", stats.failed),
        ("Aborted", stats.aborted),
        ("Handler faults", stats.faults),
    ];
    outcomes.sort_by(|a, b| b.1.cmp(&a.1));

    let finished = stats.finished();
    for (label, count) in outcomes {
        let percentage = if finished > 0 {
            (count as f64 / finished as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    let success_rate = if stats.dispatched > 0 {
        (stats.scraped as f64 / stats.dispatched as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} dispatched pages scraped)",
        success_rate, stats.scraped, stats.dispatched
    );
}
