//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetState`: lifecycle of an individual crawl target
//! - `Lifecycle`: transition-checked holder of a target's current state
//! - `HostState`: per-host dispatch timing used by the rate limiter

mod host_state;
mod target_state;

pub use host_state::HostState;
pub use target_state::{Lifecycle, TargetState};
