//! Bounded-parallel task queue
//!
//! This module handles:
//! - FIFO dispatch of submitted tasks to at most `parallel` workers
//! - Per-task completion handles
//! - The aggregate "drained" signal for finite queues
//! - Failure policy (isolate a failed task, or fail the whole queue fast)

use crate::crawler::coroutine::{run_task, Task};
use crate::{Result, ScanError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch, Notify};
use tracing::debug;

/// Whether a queue signals completion when it runs dry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// `drained()` resolves once all submitted work has finished
    Finite,
    /// `drained()` never resolves successfully
    Infinite,
}

/// How a task failure affects the rest of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Only the failed task's handle sees the error
    #[default]
    Isolate,
    /// The first failure fails `drained()`, aborts pending tasks and closes the queue
    FailFast,
}

/// Queue construction options
#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    pub parallel: usize,
    pub mode: QueueMode,
    pub policy: FailurePolicy,
}

impl QueueOptions {
    pub fn finite(parallel: usize) -> Self {
        Self {
            parallel,
            mode: QueueMode::Finite,
            policy: FailurePolicy::Isolate,
        }
    }

    pub fn infinite(parallel: usize) -> Self {
        Self {
            parallel,
            mode: QueueMode::Infinite,
            policy: FailurePolicy::Isolate,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A submitted task waiting for a worker
trait Job: Send {
    /// Runs the task, settles its handle and reports a failure if there was one
    fn start(self: Box<Self>) -> BoxFuture<'static, Option<ScanError>>;

    /// Settles the handle with an error without running the task
    fn abort(self: Box<Self>, error: ScanError);
}

struct TaskJob<T> {
    task: Task<T>,
    tx: oneshot::Sender<Result<T>>,
}

impl<T: Send + 'static> Job for TaskJob<T> {
    fn start(self: Box<Self>) -> BoxFuture<'static, Option<ScanError>> {
        let TaskJob { task, tx } = *self;
        Box::pin(async move {
            let result = AssertUnwindSafe(run_task(task))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ScanError::TaskPanicked(panic_message(&*panic))));

            let failure = result.as_ref().err().cloned();
            // The handle may have been dropped; the task still counts as run
            let _ = tx.send(result);
            failure
        })
    }

    fn abort(self: Box<Self>, error: ScanError) {
        let _ = self.tx.send(Err(error));
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Box<dyn Job>>,
    running: usize,
    submitted: bool,
    closed: bool,
    settled: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    options: QueueOptions,
    drained_tx: watch::Sender<Option<Result<()>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Jobs run outside the lock, so a poisoned lock still holds consistent state
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

/// Closes the queue when the last user handle goes away
struct CloseGuard {
    shared: Arc<Shared>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Completion handle of one submitted task
///
/// Dropping the handle does not cancel the task.
#[must_use = "a TaskHandle does nothing unless awaited"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ScanError::Cancelled)))
    }
}

/// Bounded-parallel FIFO task queue
///
/// At most `parallel` tasks run at once. Tasks can be submitted at any time,
/// including from inside a running task. Cloning the queue shares it.
#[derive(Clone)]
pub struct BoundedQueue {
    shared: Arc<Shared>,
    _guard: Arc<CloseGuard>,
}

impl BoundedQueue {
    /// Creates a queue and spawns its workers
    ///
    /// Must be called within a tokio runtime. A `parallel` of 0 is treated
    /// as 1.
    pub fn new(options: QueueOptions) -> Self {
        let options = QueueOptions {
            parallel: options.parallel.max(1),
            ..options
        };
        let (drained_tx, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            options,
            drained_tx,
        });

        for worker_id in 0..options.parallel {
            tokio::spawn(worker_loop(worker_id, Arc::clone(&shared)));
        }

        Self {
            _guard: Arc::new(CloseGuard {
                shared: Arc::clone(&shared),
            }),
            shared,
        }
    }

    pub fn options(&self) -> QueueOptions {
        self.shared.options
    }

    /// Submits a task and returns its completion handle
    ///
    /// On a closed queue the handle settles with `ScanError::QueueClosed`.
    pub fn enqueue<T: Send + 'static>(&self, task: Task<T>) -> TaskHandle<T> {
        let (tx, rx) = oneshot::channel();
        let job: Box<dyn Job> = Box::new(TaskJob { task, tx });

        let rejected = {
            let mut state = self.shared.lock();
            if state.closed {
                Some(job)
            } else {
                state.submitted = true;
                state.pending.push_back(job);
                None
            }
        };

        match rejected {
            Some(job) => job.abort(ScanError::QueueClosed),
            None => self.shared.notify.notify_one(),
        }

        TaskHandle { rx }
    }

    /// Resolves when the queue has finished all its work
    ///
    /// For a finite queue this is once nothing is pending or running after at
    /// least one submission; it settles once and the queue is closed from then
    /// on. Under `FailFast` it settles with the first task failure instead. An
    /// infinite queue never drains successfully.
    pub fn drained(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let mut rx = self.shared.drained_tx.subscribe();
        async move {
            let settled = rx
                .wait_for(|value| value.is_some())
                .await
                .map_err(|_| ScanError::Cancelled)?;
            settled.clone().unwrap_or(Err(ScanError::Cancelled))
        }
    }

    /// Number of tasks currently running
    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    /// Number of tasks waiting for a worker
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

enum Next {
    Run(Box<dyn Job>),
    Wait,
    Exit,
}

async fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    loop {
        let next = {
            let mut state = shared.lock();
            match state.pending.pop_front() {
                Some(job) => {
                    state.running += 1;
                    if !state.pending.is_empty() {
                        shared.notify.notify_one();
                    }
                    Next::Run(job)
                }
                None if state.closed => Next::Exit,
                None => Next::Wait,
            }
        };

        match next {
            Next::Run(job) => {
                let failure = job.start().await;
                finish_job(&shared, failure);
            }
            Next::Wait => shared.notify.notified().await,
            Next::Exit => {
                // Pass the wake-up on so every idle worker sees the close
                shared.notify.notify_one();
                debug!(worker_id, "Queue worker exiting");
                return;
            }
        }
    }
}

fn finish_job(shared: &Shared, failure: Option<ScanError>) {
    let mut aborted = Vec::new();
    let mut settle = None;

    {
        let mut state = shared.lock();
        state.running -= 1;

        if let Some(error) = failure {
            if shared.options.policy == FailurePolicy::FailFast && !state.settled {
                debug!(%error, "Task failed, aborting queue");
                state.settled = true;
                state.closed = true;
                aborted.extend(state.pending.drain(..));
                settle = Some(Err(error));
            }
        }

        if shared.options.mode == QueueMode::Finite
            && !state.settled
            && state.submitted
            && state.pending.is_empty()
            && state.running == 0
        {
            state.settled = true;
            state.closed = true;
            settle = Some(Ok(()));
        }
    }

    for job in aborted {
        job.abort(ScanError::Aborted);
    }

    if let Some(result) = settle {
        shared.drained_tx.send_replace(Some(result));
        shared.notify.notify_waiters();
        shared.notify.notify_one();
    }
}
