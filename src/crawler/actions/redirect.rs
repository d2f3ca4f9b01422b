use crate::crawler::fetcher::Response;
use crate::crawler::pipeline::{Action, Flow};
use crate::crawler::reference::{NodeKind, Reference, ReferenceSource};
use crate::url::resolve_url;
use crate::{Result, ScanError};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use tracing::debug;

/// Records a redirect target as a reference
///
/// The target goes through the link manager like any other link, so
/// redirect loops end at the visited check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Redirect;

#[async_trait]
impl Action for Redirect {
    fn name(&self) -> &str {
        "redirect"
    }

    async fn apply(&self, response: &mut Response) -> Result<Flow> {
        if !response.is_redirect() {
            return Ok(Flow::Continue);
        }

        let missing = || ScanError::MissingLocationHeader {
            url: response.url.to_string(),
            status: response.status,
        };

        let location = response
            .headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(missing)?;

        let target = resolve_url(&response.url, location)?;
        debug!(from = %response.url, to = %target, status = response.status, "Redirect");

        let reference = Reference::new(
            target,
            ReferenceSource {
                node: NodeKind::LocationHeader,
                attribute: None,
                resource: response.url.clone(),
                status: Some(response.status),
            },
        );
        response.references.push(reference);

        Ok(Flow::Continue)
    }
}
