//! Per-response action pipeline
//!
//! Actions run in order, each awaited before the next starts. An action can
//! stop the rest of the pipeline without failing; an action error aborts the
//! pipeline and becomes the fetch task's error.

use crate::crawler::fetcher::Response;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What the pipeline does after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One processing step applied to a response
#[async_trait]
pub trait Action: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn apply(&self, response: &mut Response) -> Result<Flow>;
}

/// Ordered list of actions
#[derive(Clone, Default)]
pub struct Pipeline {
    actions: Vec<Arc<dyn Action>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action
    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    pub fn push(&mut self, action: Arc<dyn Action>) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action names in run order
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Runs the actions over a response and returns it
    pub async fn run(&self, mut response: Response) -> Result<Response> {
        for action in &self.actions {
            if action.apply(&mut response).await? == Flow::Stop {
                debug!(action = action.name(), url = %response.url, "Pipeline stopped");
                break;
            }
        }
        Ok(response)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
