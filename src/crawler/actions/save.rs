use crate::crawler::fetcher::Response;
use crate::crawler::pipeline::{Action, Flow};
use crate::storage::{Datastore, ResponseRecord};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Writes a record of the response to the datastore
pub struct Save {
    store: Arc<dyn Datastore>,
}

impl Save {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }
}

/// Storage row for a response in its current state
pub fn response_record(response: &Response) -> ResponseRecord {
    ResponseRecord {
        url: response.url.to_string(),
        status: response.status,
        content_type: response.content_type.clone(),
        charset: response.charset.clone(),
        size: response.size.unwrap_or(0),
        elapsed_ms: response
            .elapsed
            .unwrap_or_else(|| response.started.elapsed())
            .as_millis() as u64,
        fetched_at: Utc::now().to_rfc3339(),
    }
}

#[async_trait]
impl Action for Save {
    fn name(&self) -> &str {
        "save"
    }

    async fn apply(&self, response: &mut Response) -> Result<Flow> {
        self.store.add_response(&response_record(response)).await?;
        Ok(Flow::Continue)
    }
}
