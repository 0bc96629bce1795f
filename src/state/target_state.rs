/// Target lifecycle definitions
///
/// Every crawl target moves through
/// `Pending → Dispatched → Fetching → Succeeded → Extracting → Scraped`,
/// or leaves the happy path into one of the failure terminals.
use crate::CollectorError;
use std::fmt;

/// Represents the current state of a target in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    // ===== Active States =====
    /// Target is queued in the frontier
    Pending,

    /// Target was handed to a worker and passed the rate limiter
    Dispatched,

    /// Fetch capability is running
    Fetching,

    /// Fetch returned a usable response
    Succeeded,

    /// HTML callbacks are running over the parsed document
    Extracting,

    // ===== Terminal States =====
    /// All callbacks for the document completed
    Scraped,

    /// Transport or status error, reported through `on_error`
    Failed,

    /// A request callback aborted the fetch
    Aborted,

    /// Host is outside the domain policy
    DomainRejected,

    /// Target is deeper than the configured max depth
    DepthExceeded,
}

impl TargetState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Scraped | Self::Failed | Self::Aborted | Self::DomainRejected | Self::DepthExceeded
        )
    }

    /// Returns true for policy rejections
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::DomainRejected | Self::DepthExceeded)
    }

    /// Checks whether `self -> next` is a legal step
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        use TargetState::*;

        match (self, next) {
            (Pending, Dispatched | DomainRejected | DepthExceeded) => true,
            (Dispatched, Fetching | Aborted) => true,
            (Fetching, Succeeded | Failed) => true,
            (Succeeded, Extracting) => true,
            (Extracting, Scraped) => true,
            _ => false,
        }
    }

    /// Short identifier used in logs and statistics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Extracting => "extracting",
            Self::Scraped => "scraped",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::DomainRejected => "domain_rejected",
            Self::DepthExceeded => "depth_exceeded",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition-checked state holder for a single target
#[derive(Debug)]
pub struct Lifecycle {
    state: TargetState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: TargetState::Pending,
        }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Moves to `next`, failing on an illegal transition
    pub fn advance(&mut self, next: TargetState) -> Result<TargetState, CollectorError> {
        if !self.state.can_transition_to(next) {
            return Err(CollectorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("Target state {} -> {}", self.state, next);
        self.state = next;
        Ok(next)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lifecycle = Lifecycle::new();
        for next in [
            TargetState::Dispatched,
            TargetState::Fetching,
            TargetState::Succeeded,
            TargetState::Extracting,
            TargetState::Scraped,
        ] {
            assert_eq!(lifecycle.advance(next).unwrap(), next);
        }
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_failure_path() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(TargetState::Dispatched).unwrap();
        lifecycle.advance(TargetState::Fetching).unwrap();
        lifecycle.advance(TargetState::Failed).unwrap();
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_no_transition_out_of_terminal() {
        let terminals = [
            TargetState::Scraped,
            TargetState::Failed,
            TargetState::Aborted,
            TargetState::DomainRejected,
            TargetState::DepthExceeded,
        ];
        let all = [
            TargetState::Pending,
            TargetState::Dispatched,
            TargetState::Fetching,
            TargetState::Succeeded,
            TargetState::Extracting,
            TargetState::Scraped,
            TargetState::Failed,
            TargetState::Aborted,
            TargetState::DomainRejected,
            TargetState::DepthExceeded,
        ];

        for terminal in terminals {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.advance(TargetState::Scraped).unwrap_err();
        assert!(matches!(
            err,
            CollectorError::InvalidTransition {
                from: TargetState::Pending,
                to: TargetState::Scraped
            }
        ));
        assert_eq!(lifecycle.state(), TargetState::Pending);
    }

    #[test]
    fn test_rejections() {
        assert!(TargetState::DomainRejected.is_rejection());
        assert!(TargetState::DepthExceeded.is_rejection());
        assert!(!TargetState::Failed.is_rejection());
    }
}
