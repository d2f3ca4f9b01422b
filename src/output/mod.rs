//! Output module for crawl statistics
//!
//! This module handles:
//! - Collecting per-decision link counts and page totals during a crawl
//! - Printing the end-of-crawl summary
//! - Printing stored counts from an existing SQLite database

pub mod stats;

pub use stats::{print_crawl_stats, print_store_summary, CrawlCounters, CrawlStats};
