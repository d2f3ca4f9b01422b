//! Link admission: dedup and filtering
//!
//! Every candidate URL goes through one chain of checks:
//! 1. Scheme must be http or https (`WrongProtocol`)
//! 2. Host must be non-empty (`NoDomain`)
//! 3. The link filter must accept it (`Filtered`)
//! 4. It must not be queued already (`Visited`)
//!
//! A candidate passing all four is marked queued and dispatched for fetch
//! (`Added`). Checks run one candidate at a time on the manager's own
//! single-worker queue, so the visited check and the mark are atomic.

use crate::crawler::coroutine::{Coroutine, Suspend, Task};
use crate::crawler::fetcher::Request;
use crate::crawler::reference::Reference;
use crate::crawler::scheduler::{BoundedQueue, QueueOptions};
use crate::state::LinkState;
use crate::storage::Datastore;
use crate::url::{extract_domain, is_http_scheme, normalize_url, UrlScope};
use crate::{Result, ScanError, UrlError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Something that can be offered to the link manager
#[derive(Debug, Clone)]
pub enum Candidate {
    Text(String),
    Url(Url),
    Reference(Reference),
}

impl From<&str> for Candidate {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Candidate {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Url> for Candidate {
    fn from(value: Url) -> Self {
        Self::Url(value)
    }
}

impl From<Reference> for Candidate {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

/// Decides whether an in-scope URL should be followed
#[async_trait]
pub trait LinkFilter: Send + Sync {
    async fn include(&self, url: &Url) -> Result<bool>;
}

/// Accepts every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl LinkFilter for AllowAll {
    async fn include(&self, _url: &Url) -> Result<bool> {
        Ok(true)
    }
}

/// Filter backed by a plain predicate
pub struct FnFilter<F>(pub F);

#[async_trait]
impl<F> LinkFilter for FnFilter<F>
where
    F: Fn(&Url) -> bool + Send + Sync,
{
    async fn include(&self, url: &Url) -> Result<bool> {
        Ok((self.0)(url))
    }
}

/// Filter that keeps the crawl inside a `UrlScope`
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    scope: UrlScope,
}

impl ScopeFilter {
    pub fn new(scope: UrlScope) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl LinkFilter for ScopeFilter {
    async fn include(&self, url: &Url) -> Result<bool> {
        Ok(self.scope.allows(url))
    }
}

/// Receives accepted requests for fetching
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, request: Request) -> Result<()>;
}

/// One link manager decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    /// Normalized URL, or the raw candidate when it could not be parsed
    pub url: String,
    pub state: LinkState,
}

/// Observes link manager decisions
pub trait LinkObserver: Send + Sync {
    fn on_link(&self, event: &LinkEvent);
}

/// Logs every decision at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLinkObserver;

impl LinkObserver for TracingLinkObserver {
    fn on_link(&self, event: &LinkEvent) {
        debug!(url = %event.url, state = %event.state, "Link decision");
    }
}

/// Dedup and filter front of the crawl
pub struct LinkManager {
    queue: BoundedQueue,
    store: Arc<dyn Datastore>,
    filter: Arc<dyn LinkFilter>,
    dispatcher: Arc<dyn Dispatcher>,
    observers: Vec<Arc<dyn LinkObserver>>,
}

impl LinkManager {
    /// Creates a link manager that accepts every in-protocol URL
    ///
    /// Must be called within a tokio runtime.
    pub fn new(store: Arc<dyn Datastore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            queue: BoundedQueue::new(QueueOptions::infinite(1)),
            store,
            filter: Arc::new(AllowAll),
            dispatcher,
            observers: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn LinkFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LinkObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    /// Offers a candidate URL
    ///
    /// Resolves to the decision once the candidate has been checked (and, if
    /// `Added`, marked queued and dispatched). Filter and store failures fail
    /// the returned future.
    pub async fn add(&self, candidate: impl Into<Candidate>) -> Result<LinkState> {
        let check = LinkCheck {
            candidate: Some(candidate.into()),
            target: None,
            step: CheckStep::Start,
            store: Arc::clone(&self.store),
            filter: Arc::clone(&self.filter),
            dispatcher: Arc::clone(&self.dispatcher),
        };

        let event = self.queue.enqueue(Task::from_coroutine(check)).await?;

        for observer in &self.observers {
            observer.on_link(&event);
        }

        Ok(event.state)
    }
}

/// Parses a candidate, or decides it without parsing
fn classify(candidate: Candidate) -> Result<std::result::Result<(Url, Request), LinkEvent>> {
    let (url, request) = match candidate {
        Candidate::Text(text) => match normalize_url(&text) {
            Ok(url) => {
                let request = Request::new(url.clone());
                (url, request)
            }
            Err(error) => return rejected_text(text, error).map(Err),
        },
        Candidate::Url(mut url) => {
            url.set_fragment(None);
            let request = Request::new(url.clone());
            (url, request)
        }
        Candidate::Reference(reference) => {
            let mut request = Request::from(&reference);
            request.url.set_fragment(None);
            (request.url.clone(), request)
        }
    };

    if !is_http_scheme(&url) {
        return Ok(Err(LinkEvent {
            url: url.to_string(),
            state: LinkState::WrongProtocol,
        }));
    }

    if extract_domain(&url).is_none() {
        return Ok(Err(LinkEvent {
            url: url.to_string(),
            state: LinkState::NoDomain,
        }));
    }

    Ok(Ok((url, request)))
}

/// Decision for a string that does not parse as an absolute URL
fn rejected_text(text: String, error: UrlError) -> Result<LinkEvent> {
    let lower = text.trim().to_ascii_lowercase();
    let http_like = lower.starts_with("http://") || lower.starts_with("https://");

    let state = match error {
        UrlError::Relative(_) => LinkState::WrongProtocol,
        UrlError::MissingDomain(_) if http_like => LinkState::NoDomain,
        UrlError::Parse(_) if http_like => return Err(ScanError::InvalidUrl(error)),
        UrlError::MissingDomain(_) | UrlError::Parse(_) => LinkState::WrongProtocol,
    };

    Ok(LinkEvent { url: text, state })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckStep {
    Start,
    Filtering,
    CheckingQueued,
    Marking,
}

/// Results of the futures a link check waits on
enum CheckValue {
    Include(bool),
    Queued(bool),
    Marked,
}

/// Check-and-mark for one candidate, as a resumable state machine
struct LinkCheck {
    candidate: Option<Candidate>,
    target: Option<(Url, Request)>,
    step: CheckStep,
    store: Arc<dyn Datastore>,
    filter: Arc<dyn LinkFilter>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl LinkCheck {
    fn url(&self) -> String {
        self.target
            .as_ref()
            .map(|(url, _)| url.to_string())
            .unwrap_or_default()
    }

    fn finish(&self, state: LinkState) -> Suspend<CheckValue, LinkEvent> {
        Suspend::Return(LinkEvent {
            url: self.url(),
            state,
        })
    }
}

impl Coroutine for LinkCheck {
    type Yield = CheckValue;
    type Output = LinkEvent;

    fn resume(
        &mut self,
        input: Option<Result<CheckValue>>,
    ) -> Result<Suspend<CheckValue, LinkEvent>> {
        let value = input.transpose()?;

        match (self.step, value) {
            (CheckStep::Start, _) => {
                let candidate = self.candidate.take().ok_or(ScanError::NotInvocable)?;
                let (url, request) = match classify(candidate)? {
                    Ok(target) => target,
                    Err(event) => return Ok(Suspend::Return(event)),
                };

                let filter = Arc::clone(&self.filter);
                let filter_url = url.clone();
                self.target = Some((url, request));
                self.step = CheckStep::Filtering;

                Ok(Suspend::Await(Box::pin(async move {
                    filter.include(&filter_url).await.map(CheckValue::Include)
                })))
            }
            (CheckStep::Filtering, Some(CheckValue::Include(false))) => {
                Ok(self.finish(LinkState::Filtered))
            }
            (CheckStep::Filtering, Some(CheckValue::Include(true))) => {
                let store = Arc::clone(&self.store);
                let url = self.url();
                self.step = CheckStep::CheckingQueued;

                Ok(Suspend::Await(Box::pin(async move {
                    store
                        .is_queued(&url)
                        .await
                        .map(CheckValue::Queued)
                        .map_err(ScanError::from)
                })))
            }
            (CheckStep::CheckingQueued, Some(CheckValue::Queued(true))) => {
                Ok(self.finish(LinkState::Visited))
            }
            (CheckStep::CheckingQueued, Some(CheckValue::Queued(false))) => {
                let store = Arc::clone(&self.store);
                let url = self.url();
                self.step = CheckStep::Marking;

                Ok(Suspend::Await(Box::pin(async move {
                    store
                        .set_queued(&url)
                        .await
                        .map(|_| CheckValue::Marked)
                        .map_err(ScanError::from)
                })))
            }
            (CheckStep::Marking, Some(CheckValue::Marked)) => {
                let (_, request) = self.target.as_ref().ok_or(ScanError::NotInvocable)?;
                self.dispatcher.dispatch(request.clone())?;
                Ok(self.finish(LinkState::Added))
            }
            (step, _) => Err(ScanError::step(
                "link-check",
                format!("unexpected resume in step {:?}", step),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::reference::{NodeKind, ReferenceSource};
    use crate::storage::{MemoryDatastore, ReferenceRecord, ResponseRecord, StoreError, StoreResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<Request>>,
    }

    impl Recorder {
        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.to_string())
                .collect()
        }
    }

    impl Dispatcher for Recorder {
        fn dispatch(&self, request: Request) -> Result<()> {
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<LinkEvent>>);

    impl LinkObserver for EventLog {
        fn on_link(&self, event: &LinkEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl Datastore for BrokenStore {
        async fn is_queued(&self, _url: &str) -> StoreResult<bool> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        async fn set_queued(&self, _url: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn add_reference(&self, _reference: &ReferenceRecord) -> StoreResult<()> {
            Ok(())
        }
        async fn add_response(&self, _response: &ResponseRecord) -> StoreResult<()> {
            Ok(())
        }
    }

    struct BrokenFilter;

    #[async_trait]
    impl LinkFilter for BrokenFilter {
        async fn include(&self, _url: &Url) -> Result<bool> {
            Err(ScanError::Filter("lookup failed".to_string()))
        }
    }

    fn manager() -> (LinkManager, Arc<MemoryDatastore>, Arc<Recorder>) {
        let store = Arc::new(MemoryDatastore::new());
        let recorder = Arc::new(Recorder::default());
        let manager = LinkManager::new(store.clone(), recorder.clone());
        (manager, store, recorder)
    }

    #[tokio::test]
    async fn test_added_then_visited() {
        let (manager, store, recorder) = manager();

        assert_eq!(
            manager.add("http://example.com/").await.unwrap(),
            LinkState::Added
        );
        assert_eq!(
            manager.add("http://example.com/").await.unwrap(),
            LinkState::Visited
        );

        assert_eq!(recorder.urls(), vec!["http://example.com/"]);
        assert!(store.is_queued("http://example.com/").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_yield_one_added() {
        let (manager, _store, recorder) = manager();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.add("http://example.com/same").await })
            })
            .collect();

        let mut added = 0;
        let mut visited = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                LinkState::Added => added += 1,
                LinkState::Visited => visited += 1,
                other => panic!("unexpected state {:?}", other),
            }
        }

        assert_eq!(added, 1);
        assert_eq!(visited, 24);
        assert_eq!(recorder.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_fragment_variants_dedup() {
        let (manager, _store, recorder) = manager();

        assert_eq!(
            manager.add("http://example.com/a#frag").await.unwrap(),
            LinkState::Added
        );
        assert_eq!(
            manager.add("http://example.com/a").await.unwrap(),
            LinkState::Visited
        );
        assert_eq!(recorder.urls(), vec!["http://example.com/a"]);
    }

    #[tokio::test]
    async fn test_wrong_protocol() {
        let (manager, store, recorder) = manager();

        for candidate in [
            "ftp://example.com/",
            "mailto:someone@example.com",
            "javascript:void(0)",
            "/relative/path",
            "ftp://",
        ] {
            assert_eq!(
                manager.add(candidate).await.unwrap(),
                LinkState::WrongProtocol,
                "candidate {}",
                candidate
            );
        }

        assert!(recorder.urls().is_empty());
        assert_eq!(store.queued_count(), 0);
    }

    #[tokio::test]
    async fn test_no_domain() {
        let (manager, _store, recorder) = manager();
        assert_eq!(manager.add("http://").await.unwrap(), LinkState::NoDomain);
        assert!(recorder.urls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_http_url_fails() {
        let (manager, _store, _recorder) = manager();
        let result = manager.add("http://exa mple.com/").await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_filtered_is_not_marked() {
        let (manager, store, recorder) = manager();
        let manager = manager.with_filter(Arc::new(FnFilter(|url: &Url| {
            url.path().starts_with("/docs")
        })));

        assert_eq!(
            manager.add("http://example.com/blog").await.unwrap(),
            LinkState::Filtered
        );
        assert_eq!(
            manager.add("http://example.com/docs/1").await.unwrap(),
            LinkState::Added
        );

        assert!(!store.is_queued("http://example.com/blog").await.unwrap());
        assert_eq!(recorder.urls(), vec!["http://example.com/docs/1"]);
    }

    #[tokio::test]
    async fn test_scope_filter() {
        let (manager, _store, _recorder) = manager();
        let scope = UrlScope::new(vec![], vec!["*.example.com".to_string()]);
        let manager = manager.with_filter(Arc::new(ScopeFilter::new(scope)));

        assert_eq!(
            manager.add("https://www.example.com/").await.unwrap(),
            LinkState::Added
        );
        assert_eq!(
            manager.add("https://example.org/").await.unwrap(),
            LinkState::Filtered
        );
    }

    #[tokio::test]
    async fn test_filter_error_propagates() {
        let (manager, store, recorder) = manager();
        let manager = manager.with_filter(Arc::new(BrokenFilter));

        let result = manager.add("http://example.com/").await;
        assert!(matches!(result, Err(ScanError::Filter(_))));
        assert!(recorder.urls().is_empty());
        assert_eq!(store.queued_count(), 0);

        // The manager keeps working after a failed check
        let result = manager.add("ftp://example.com/").await;
        assert_eq!(result.unwrap(), LinkState::WrongProtocol);
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let recorder = Arc::new(Recorder::default());
        let manager = LinkManager::new(Arc::new(BrokenStore), recorder.clone());

        let result = manager.add("http://example.com/").await;
        assert!(matches!(
            result,
            Err(ScanError::Store(StoreError::Backend(_)))
        ));
        assert!(recorder.urls().is_empty());
    }

    #[tokio::test]
    async fn test_observers_see_every_decision() {
        let (manager, _store, _recorder) = manager();
        let log = Arc::new(EventLog::default());
        let manager = manager
            .with_observer(log.clone())
            .with_observer(Arc::new(TracingLinkObserver));

        manager.add("http://example.com/#x").await.unwrap();
        manager.add("http://example.com/").await.unwrap();
        manager.add("ftp://example.com/").await.unwrap();

        let events = log.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                LinkEvent {
                    url: "http://example.com/".to_string(),
                    state: LinkState::Added
                },
                LinkEvent {
                    url: "http://example.com/".to_string(),
                    state: LinkState::Visited
                },
                LinkEvent {
                    url: "ftp://example.com/".to_string(),
                    state: LinkState::WrongProtocol
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reference_carries_referrer() {
        let (manager, _store, recorder) = manager();
        let reference = Reference::new(
            Url::parse("http://example.com/next#part").unwrap(),
            ReferenceSource {
                node: NodeKind::Anchor,
                attribute: Some("href"),
                resource: Url::parse("http://example.com/start").unwrap(),
                status: None,
            },
        );

        assert_eq!(manager.add(reference).await.unwrap(), LinkState::Added);

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests[0].url.as_str(), "http://example.com/next");
        assert_eq!(
            requests[0].referrer.as_ref().map(Url::as_str),
            Some("http://example.com/start")
        );
    }

    #[tokio::test]
    async fn test_url_candidate() {
        let (manager, _store, _recorder) = manager();
        let url = Url::parse("https://example.com/page").unwrap();
        assert_eq!(manager.add(url.clone()).await.unwrap(), LinkState::Added);
        assert_eq!(manager.add(url).await.unwrap(), LinkState::Visited);
    }
}
