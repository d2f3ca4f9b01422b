//! Crawl statistics
//!
//! `CrawlCounters` is shared by the running crawl and updated with atomics;
//! `CrawlStats` is a plain snapshot of it.

use crate::state::LinkState;
use crate::storage::{RunRecord, StoreCounts};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one crawl
#[derive(Debug, Default)]
pub struct CrawlCounters {
    links: [AtomicU64; 5],
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    bytes_downloaded: AtomicU64,
}

fn slot(state: LinkState) -> usize {
    match state {
        LinkState::WrongProtocol => 0,
        LinkState::NoDomain => 1,
        LinkState::Filtered => 2,
        LinkState::Visited => 3,
        LinkState::Added => 4,
    }
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_link(&self, state: LinkState) {
        self.links[slot(state)].fetch_add(1, Ordering::Relaxed);
    }

    /// Records a processed page; returns the number of pages fetched so far
    pub fn record_page(&self, bytes: u64) -> u64 {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
        self.pages_fetched.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_failure(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, elapsed: Duration) -> CrawlStats {
        let link = |state: LinkState| self.links[slot(state)].load(Ordering::Relaxed);

        CrawlStats {
            added: link(LinkState::Added),
            visited: link(LinkState::Visited),
            filtered: link(LinkState::Filtered),
            no_domain: link(LinkState::NoDomain),
            wrong_protocol: link(LinkState::WrongProtocol),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub added: u64,
    pub visited: u64,
    pub filtered: u64,
    pub no_domain: u64,
    pub wrong_protocol: u64,

    /// Responses that made it through the pipeline
    pub pages_fetched: u64,

    /// Fetch tasks that failed, whatever the step
    pub pages_failed: u64,

    pub bytes_downloaded: u64,
    pub elapsed: Duration,
}

impl CrawlStats {
    /// Number of decisions recorded for `state`
    pub fn count(&self, state: LinkState) -> u64 {
        match state {
            LinkState::WrongProtocol => self.wrong_protocol,
            LinkState::NoDomain => self.no_domain,
            LinkState::Filtered => self.filtered,
            LinkState::Visited => self.visited,
            LinkState::Added => self.added,
        }
    }

    /// Total number of link decisions
    pub fn links_seen(&self) -> u64 {
        LinkState::all_states()
            .into_iter()
            .map(|state| self.count(state))
            .sum()
    }

    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_fetched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints the end-of-crawl summary to stdout
pub fn print_crawl_stats(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Pages:");
    println!("  Fetched: {}", stats.pages_fetched);
    println!("  Failed: {}", stats.pages_failed);
    println!("  Bytes downloaded: {}", stats.bytes_downloaded);
    println!(
        "  Duration: {:.1}s ({:.2} pages/sec)",
        stats.elapsed.as_secs_f64(),
        stats.pages_per_second()
    );
    println!();

    let total = stats.links_seen();
    println!("Links ({} decisions):", total);
    for state in LinkState::all_states() {
        let count = stats.count(state);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
}

/// Prints stored counts from a SQLite database to stdout
pub fn print_store_summary(
    counts: &StoreCounts,
    statuses: &[(u16, u64)],
    latest_run: Option<&RunRecord>,
) {
    println!("=== Stored Crawl Data ===\n");

    if let Some(run) = latest_run {
        println!("Latest run:");
        println!("  Id: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Config hash: {}", run.config_hash);
        println!();
    }

    println!("Overview:");
    println!("  Runs: {}", counts.runs);
    println!("  Queued URLs: {}", counts.queued);
    println!("  References: {}", counts.references);
    println!("  Responses: {}", counts.responses);
    println!();

    if !statuses.is_empty() {
        println!("Responses by Status:");
        for (status, count) in statuses {
            println!("  {}: {}", status, count);
        }
    }
}
