//! Suspendable units of work
//!
//! A `Coroutine` is an explicit state machine that the runner resumes until it
//! returns. Each resume may hand back a future to await; its result is passed
//! into the next resume, so a failed await can be handled (or not) at the
//! point where the coroutine suspended.

use crate::{Result, ScanError};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// What a coroutine asks the runner to do after one resume
pub enum Suspend<Y, O> {
    /// Await this future, then resume with its result
    Await(BoxFuture<'static, Result<Y>>),
    /// Resume straight away with this value
    Ready(Y),
    /// Finish with this output
    Return(O),
}

/// A suspendable sequence of steps
///
/// `resume` receives `None` on the first call and the result of the previous
/// suspension afterwards. Returning `Err` fails the whole run immediately.
pub trait Coroutine: Send {
    type Yield: Send + 'static;
    type Output: Send + 'static;

    fn resume(
        &mut self,
        input: Option<Result<Self::Yield>>,
    ) -> Result<Suspend<Self::Yield, Self::Output>>;
}

/// A unit of work in one of its runnable forms
pub enum Work<T> {
    /// Already settled
    Ready(Result<T>),
    /// A future (coroutines are driven into one of these)
    Future(BoxFuture<'static, Result<T>>),
}

impl<T: Send + 'static> Work<T> {
    pub fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn failed(error: ScanError) -> Self {
        Self::Ready(Err(error))
    }

    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::Future(Box::pin(future))
    }

    pub fn coroutine<C>(coroutine: C) -> Self
    where
        C: Coroutine<Output = T> + 'static,
    {
        Self::Future(Box::pin(drive(coroutine)))
    }
}

type TaskBody<T> = Box<dyn FnOnce() -> Work<T> + Send>;

/// Deferred work: a closure that produces the `Work` when invoked
///
/// A task can be invoked once. An empty task, or one already invoked, fails
/// with `ScanError::NotInvocable`.
pub struct Task<T> {
    body: Option<TaskBody<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task from a closure producing its work
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> Work<T> + Send + 'static,
    {
        Self {
            body: Some(Box::new(body)),
        }
    }

    /// Creates a task that runs a future
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::new(move || Work::future(future))
    }

    /// Creates a task that drives a coroutine
    pub fn from_coroutine<C>(coroutine: C) -> Self
    where
        C: Coroutine<Output = T> + 'static,
    {
        Self::new(move || Work::coroutine(coroutine))
    }

    /// Creates a task with no body
    pub fn empty() -> Self {
        Self { body: None }
    }

    pub fn is_invocable(&self) -> bool {
        self.body.is_some()
    }

    /// Invokes the body, consuming it
    pub fn invoke(&mut self) -> Result<Work<T>> {
        let body = self.body.take().ok_or(ScanError::NotInvocable)?;
        Ok(body())
    }
}

impl<T: Send + 'static> Default for Task<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("invocable", &self.body.is_some())
            .finish()
    }
}

/// Drives a coroutine to completion
pub async fn drive<C: Coroutine>(mut coroutine: C) -> Result<C::Output> {
    let mut input = None;
    loop {
        match coroutine.resume(input.take())? {
            Suspend::Await(future) => input = Some(future.await),
            Suspend::Ready(value) => input = Some(Ok(value)),
            Suspend::Return(output) => return Ok(output),
        }
    }
}

/// Runs a unit of work to completion
pub async fn run<T>(work: Work<T>) -> Result<T> {
    match work {
        Work::Ready(result) => result,
        Work::Future(future) => future.await,
    }
}

/// Invokes a task and runs its work to completion
pub async fn run_task<T: Send + 'static>(mut task: Task<T>) -> Result<T> {
    let work = task.invoke()?;
    run(work).await
}
