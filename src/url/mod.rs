//! URL handling module
//!
//! This module provides URL normalization for dedup keys, host extraction,
//! link resolution, and the pattern matching used by domain policies and
//! rate rules.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, host_matches, parse_target_url, resolve_link};
pub use matcher::{glob_match, matches_wildcard};
pub use normalize::{normalize_url, strip_fragment};
