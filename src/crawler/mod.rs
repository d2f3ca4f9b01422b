//! Crawler module: the scheduling core and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - Coroutine-style tasks and the runner that drives them
//! - A bounded-parallel task queue with a drain signal
//! - Link admission (dedup and filtering)
//! - The per-response action pipeline and its standard actions
//! - HTTP fetching and HTML/CSS reference extraction
//! - Overall crawl coordination

pub mod actions;
mod coordinator;
pub mod coroutine;
mod fetcher;
mod link_manager;
mod parser;
mod pipeline;
mod reference;
pub mod scheduler;

pub use actions::standard_pipeline;
pub use coordinator::{Crawler, CrawlerBuilder, DEFAULT_PARALLEL};
pub use coroutine::{run, run_task, Coroutine, Suspend, Task, Work};
pub use fetcher::{
    build_http_client, parse_content_type, BodyStream, HttpRequester, Request, Requester,
    Response, REDIRECT_STATUSES,
};
pub use link_manager::{
    AllowAll, Candidate, Dispatcher, FnFilter, LinkEvent, LinkFilter, LinkManager, LinkObserver,
    ScopeFilter, TracingLinkObserver,
};
pub use parser::{extract_css_references, extract_html_references};
pub use pipeline::{Action, Flow, Pipeline};
pub use reference::{NodeKind, Reference, ReferenceSource};
pub use scheduler::{BoundedQueue, FailurePolicy, QueueMode, QueueOptions, TaskHandle};

use crate::config::Config;
use crate::output::CrawlStats;
use crate::storage::Datastore;
use crate::Result;
use std::sync::Arc;

/// Runs a complete crawl from configuration
///
/// Builds an HTTP crawler over `store` and crawls from the configured seeds
/// until the fetch queue drains.
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl completed
/// * `Err(ScanError)` - Crawl failed
pub async fn crawl(config: &Config, store: Arc<dyn Datastore>) -> Result<CrawlStats> {
    let crawler = Crawler::from_config(config, store)?;
    crawler.run(config.scope.seeds.iter().map(String::as_str)).await
}
