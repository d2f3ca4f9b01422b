use crate::crawler::fetcher::Response;
use crate::crawler::pipeline::{Action, Flow};
use crate::Result;
use async_trait::async_trait;
use futures::StreamExt;

/// Reads the whole body into the response
#[derive(Debug, Clone, Copy, Default)]
pub struct Download;

#[async_trait]
impl Action for Download {
    fn name(&self) -> &str {
        "download"
    }

    async fn apply(&self, response: &mut Response) -> Result<Flow> {
        download_body(response).await?;
        Ok(Flow::Continue)
    }
}

/// Drains the body stream once, setting `body`, `size` and `elapsed`
///
/// Does nothing if the body was already downloaded.
pub async fn download_body(response: &mut Response) -> Result<()> {
    let Some(mut stream) = response.take_body_stream() else {
        return Ok(());
    };

    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }

    response.size = Some(body.len() as u64);
    response.elapsed = Some(response.started.elapsed());
    response.body = Some(body);
    Ok(())
}
