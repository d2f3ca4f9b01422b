//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the pieces of a crawl together:
//! - A finite `BoundedQueue` running one fetch task per accepted URL
//! - The `LinkManager` deciding which discovered URLs become fetch tasks
//! - The action `Pipeline` each response goes through
//!
//! A fetch task awaits the link manager's decision for every reference its
//! response produced before it completes, so the fetch queue only drains once
//! no more work can appear.

use crate::config::Config;
use crate::crawler::actions::standard_pipeline;
use crate::crawler::coroutine::Task;
use crate::crawler::fetcher::{HttpRequester, Request, Requester};
use crate::crawler::link_manager::{
    AllowAll, Candidate, Dispatcher, LinkEvent, LinkFilter, LinkManager, LinkObserver,
    ScopeFilter, TracingLinkObserver,
};
use crate::crawler::pipeline::Pipeline;
use crate::crawler::scheduler::{BoundedQueue, FailurePolicy, QueueOptions};
use crate::output::{CrawlCounters, CrawlStats};
use crate::state::LinkState;
use crate::storage::{Datastore, MemoryDatastore};
use crate::url::UrlScope;
use crate::{Result, ScanError};
use futures::future::join_all;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default number of concurrent fetch tasks
pub const DEFAULT_PARALLEL: usize = 5;

/// A crawl over one site graph
///
/// A crawler runs once: after its fetch queue drains the queue is closed.
pub struct Crawler {
    shared: Arc<CrawlShared>,
}

struct CrawlShared {
    requester: Arc<dyn Requester>,
    pipeline: Pipeline,
    links: LinkManager,
    queue: BoundedQueue,
    policy: FailurePolicy,
    counters: Arc<CrawlCounters>,
}

/// Builder for `Crawler`
pub struct CrawlerBuilder {
    requester: Arc<dyn Requester>,
    store: Arc<dyn Datastore>,
    pipeline: Option<Pipeline>,
    filter: Arc<dyn LinkFilter>,
    observers: Vec<Arc<dyn LinkObserver>>,
    parallel: usize,
    policy: FailurePolicy,
}

impl CrawlerBuilder {
    /// Visited set and record sink; in-memory by default
    pub fn store(mut self, store: Arc<dyn Datastore>) -> Self {
        self.store = store;
        self
    }

    /// Response pipeline; `standard_pipeline` over the store by default
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn LinkFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LinkObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the crawler and spawns its queue workers
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Crawler {
        let CrawlerBuilder {
            requester,
            store,
            pipeline,
            filter,
            observers,
            parallel,
            policy,
        } = self;

        let pipeline = pipeline.unwrap_or_else(|| standard_pipeline(Arc::clone(&store)));
        let counters = Arc::new(CrawlCounters::new());

        let shared = Arc::new_cyclic(|weak: &Weak<CrawlShared>| {
            let dispatcher = Arc::new(FetchDispatcher {
                shared: weak.clone(),
            });

            let mut links = LinkManager::new(store, dispatcher)
                .with_filter(filter)
                .with_observer(Arc::new(TracingLinkObserver))
                .with_observer(Arc::new(StatsObserver {
                    counters: Arc::clone(&counters),
                }));
            for observer in observers {
                links = links.with_observer(observer);
            }

            CrawlShared {
                requester,
                pipeline,
                links,
                queue: BoundedQueue::new(QueueOptions::finite(parallel).with_policy(policy)),
                policy,
                counters,
            }
        });

        Crawler { shared }
    }
}

impl Crawler {
    /// Starts building a crawler around a requester
    pub fn builder(requester: Arc<dyn Requester>) -> CrawlerBuilder {
        CrawlerBuilder {
            requester,
            store: Arc::new(MemoryDatastore::new()),
            pipeline: None,
            filter: Arc::new(AllowAll),
            observers: Vec::new(),
            parallel: DEFAULT_PARALLEL,
            policy: FailurePolicy::default(),
        }
    }

    /// Builds an HTTP crawler from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `store` - Datastore for the visited set and records
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Crawler scoped by the configured prefixes and domains
    /// * `Err(ScanError)` - The HTTP client could not be built
    pub fn from_config(config: &Config, store: Arc<dyn Datastore>) -> Result<Self> {
        let requester = HttpRequester::new(&config.user_agent, config.crawler.request_timeout())?;
        let scope = UrlScope::from_config(&config.scope);

        let mut builder = Crawler::builder(Arc::new(requester))
            .store(store)
            .parallel(config.crawler.parallel as usize)
            .failure_policy(config.crawler.failure_policy);
        if !scope.is_unrestricted() {
            builder = builder.filter(Arc::new(ScopeFilter::new(scope)));
        }

        Ok(builder.build())
    }

    pub fn link_manager(&self) -> &LinkManager {
        &self.shared.links
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        self.shared.links.datastore()
    }

    /// Counters so far, with no elapsed time
    pub fn stats(&self) -> CrawlStats {
        self.shared.counters.snapshot(Default::default())
    }

    /// Crawls from the given seeds until no work is left
    ///
    /// Seeds go through the link manager like discovered links. They are
    /// offered from inside a task on the fetch queue, so the queue cannot
    /// drain between two seeds.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStats)` - The fetch queue drained
    /// * `Err(ScanError::NoSeedsAccepted)` - Every seed was rejected
    /// * `Err(ScanError)` - A seed could not be offered, or under
    ///   `FailFast` the first task failure
    pub async fn run<I>(&self, seeds: I) -> Result<CrawlStats>
    where
        I: IntoIterator,
        I::Item: Into<Candidate>,
    {
        let started = Instant::now();
        let seeds: Vec<Candidate> = seeds.into_iter().map(Into::into).collect();
        info!("Starting crawl with {} seeds", seeds.len());

        let drained = self.shared.queue.drained();

        let shared = Arc::clone(&self.shared);
        let accepted = self
            .shared
            .queue
            .enqueue(Task::from_future(async move {
                let mut accepted = 0usize;
                for seed in seeds {
                    if shared.links.add(seed).await? == LinkState::Added {
                        accepted += 1;
                    }
                }
                Ok(accepted)
            }))
            .await?;

        if accepted == 0 {
            return Err(ScanError::NoSeedsAccepted);
        }

        drained.await?;

        let stats = self.shared.counters.snapshot(started.elapsed());
        info!(
            "Crawl completed: {} pages fetched, {} failed in {:?}",
            stats.pages_fetched, stats.pages_failed, stats.elapsed
        );
        Ok(stats)
    }
}

impl CrawlShared {
    /// Fetches one URL, runs the pipeline and offers every reference found
    async fn process(&self, request: &Request) -> Result<()> {
        debug!(url = %request.url, "Fetching");
        let response = self.requester.fetch(request).await?;
        let mut response = self.pipeline.run(response).await?;

        let fetched = self.counters.record_page(response.size.unwrap_or(0));
        if fetched % 10 == 0 {
            info!(
                "Progress: {} pages fetched, {} running, {} pending",
                fetched,
                self.queue.running(),
                self.queue.pending()
            );
        }

        let references = std::mem::take(&mut response.references);
        let store = self.links.datastore();
        // Every sibling decision settles before the first error is reported
        join_all(references.into_iter().map(|reference| async move {
            if let Some(record) = reference.to_record() {
                store.add_reference(&record).await?;
            }
            self.links.add(reference).await
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        Ok(())
    }
}

async fn fetch_task(shared: Arc<CrawlShared>, request: Request) -> Result<()> {
    match shared.process(&request).await {
        Ok(()) => Ok(()),
        Err(error) => {
            shared.counters.record_failure();
            warn!(url = %request.url, "Fetch task failed: {}", error);
            match shared.policy {
                FailurePolicy::Isolate => Ok(()),
                FailurePolicy::FailFast => Err(error),
            }
        }
    }
}

/// Submits accepted URLs to the crawler's fetch queue
struct FetchDispatcher {
    shared: Weak<CrawlShared>,
}

impl Dispatcher for FetchDispatcher {
    fn dispatch(&self, request: Request) -> Result<()> {
        let shared = self.shared.upgrade().ok_or(ScanError::Cancelled)?;
        if shared.queue.is_closed() {
            return Err(ScanError::QueueClosed);
        }

        let queue = shared.queue.clone();
        // Failures are counted by the task and reported through drained()
        let _ = queue.enqueue(Task::from_future(fetch_task(shared, request)));
        Ok(())
    }
}

struct StatsObserver {
    counters: Arc<CrawlCounters>,
}

impl LinkObserver for StatsObserver {
    fn on_link(&self, event: &LinkEvent) {
        self.counters.record_link(event.state);
    }
}
