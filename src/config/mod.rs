//! Configuration module for ripple-collector
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use ripple_collector::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("collector.toml")).unwrap();
//! println!("Crawler will use max depth: {:?}", config.policy().max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CollectorConfig, Config, ExtractEntry, LimitEntry, UserAgentConfig};

// Re-export parser functions
pub use parser::{config_fingerprint, load_config, load_config_with_hash, parse_config};
