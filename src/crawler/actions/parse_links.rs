use crate::crawler::actions::download_body;
use crate::crawler::fetcher::Response;
use crate::crawler::parser::{extract_css_references, extract_html_references};
use crate::crawler::pipeline::{Action, Flow};
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

/// Extracts references from successful HTML and CSS responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseLinks;

#[async_trait]
impl Action for ParseLinks {
    fn name(&self) -> &str {
        "parse-links"
    }

    async fn apply(&self, response: &mut Response) -> Result<Flow> {
        if response.status != 200 {
            return Ok(Flow::Continue);
        }

        let is_html = response.content_type.as_deref() == Some("text/html");
        let is_css = response.content_type.as_deref() == Some("text/css");
        if !is_html && !is_css {
            return Ok(Flow::Continue);
        }

        download_body(response).await?;
        let text = response.text().unwrap_or_default();

        let found = if is_html {
            extract_html_references(&text, &response.url)
        } else {
            extract_css_references(&text, &response.url)
        };

        debug!(url = %response.url, count = found.len(), "Found references");
        response.references.extend(found);

        Ok(Flow::Continue)
    }
}
