use std::time::Duration;
use tokio::time::Instant;

/// Tracks dispatch timing for a single host
///
/// The rate limiter keeps one of these per host behind an async mutex, so
/// every worker targeting the same host observes the same timestamps.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of dispatches made to this host in the current session
    pub dispatch_count: u32,

    /// Timestamp of the last dispatch to this host
    pub last_dispatch: Option<Instant>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dispatch to this host
    pub fn record_dispatch(&mut self, now: Instant) {
        self.dispatch_count += 1;
        self.last_dispatch = Some(now);
    }

    /// Time left before `delay` has passed since the last dispatch
    ///
    /// Returns None if a dispatch may happen now.
    pub fn time_until_next_dispatch(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let elapsed = now.saturating_duration_since(last);

        (elapsed < delay).then(|| delay - elapsed)
    }
}
