//! Output module for crawl statistics
//!
//! This module handles:
//! - Counting target outcomes while the crawl runs
//! - Printing the end-of-run summary

pub mod stats;

pub use stats::{print_statistics, CrawlStats, StatsRecorder};
