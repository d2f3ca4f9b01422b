//! HTTP fetcher implementation
//!
//! This module is the crawler's HTTP boundary:
//! - The `Requester` trait the crawl consumes
//! - Building HTTP clients with proper user agent strings
//! - The response model handed to the action pipeline
//!
//! Redirects are never followed here; the redirect step turns them into
//! references so they go through the link manager like any other link.

use crate::config::UserAgentConfig;
use crate::crawler::reference::Reference;
use crate::{Result, ScanError};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE, REFERER};
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};
use url::Url;

/// Statuses whose `Location` header is followed
pub const REDIRECT_STATUSES: [u16; 6] = [300, 301, 302, 303, 307, 308];

/// Streamed response body
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// A fetch to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    /// Page the URL was found on, sent as `Referer`
    pub referrer: Option<Url>,
}

impl Request {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            referrer: None,
        }
    }
}

impl From<&Reference> for Request {
    fn from(reference: &Reference) -> Self {
        Self {
            url: reference.url.clone(),
            referrer: reference
                .source
                .as_ref()
                .map(|source| source.resource.clone()),
        }
    }
}

/// A fetched response as it moves through the action pipeline
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    /// Lowercase MIME type from `Content-Type`, without parameters
    pub content_type: Option<String>,
    pub charset: Option<String>,
    body_stream: Option<BodyStream>,
    /// Set once the body has been downloaded
    pub body: Option<Vec<u8>>,
    pub size: Option<u64>,
    pub elapsed: Option<Duration>,
    pub started: Instant,
    /// References found by the pipeline, offered to the link manager afterwards
    pub references: Vec<Reference>,
}

impl Response {
    pub fn new(
        url: Url,
        status: u16,
        headers: HeaderMap,
        body_stream: BodyStream,
        started: Instant,
    ) -> Self {
        let (content_type, charset) = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(parse_content_type)
            .unwrap_or((None, None));

        Self {
            url,
            status,
            headers,
            content_type,
            charset,
            body_stream: Some(body_stream),
            body: None,
            size: None,
            elapsed: None,
            started,
            references: Vec::new(),
        }
    }

    /// Builds a response whose body is already in memory
    pub fn from_bytes(url: Url, status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        let body_stream: BodyStream = Box::pin(stream::once(async move { Ok(body) }));
        Self::new(url, status, headers, body_stream, Instant::now())
    }

    /// Takes the body stream; `None` if it was already taken
    pub fn take_body_stream(&mut self) -> Option<BodyStream> {
        self.body_stream.take()
    }

    /// Downloaded body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// Returns true for a status whose `Location` header is followed
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("charset", &self.charset)
            .field("size", &self.size)
            .field("elapsed", &self.elapsed)
            .field("references", &self.references.len())
            .finish()
    }
}

/// Splits a `Content-Type` value into MIME type and charset
///
/// ```
/// use site_scanner::crawler::parse_content_type;
///
/// let (mime, charset) = parse_content_type("Text/HTML; charset=\"UTF-8\"");
/// assert_eq!(mime.as_deref(), Some("text/html"));
/// assert_eq!(charset.as_deref(), Some("utf-8"));
/// ```
pub fn parse_content_type(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.split(';');

    let mime = parts
        .next()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty());

    let charset = parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_lowercase())
        } else {
            None
        }
    });

    (mime, charset)
}

/// The HTTP boundary of the crawler
#[async_trait]
pub trait Requester: Send + Sync {
    /// Sends the request; must not follow redirects
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_scanner::config::UserAgentConfig;
/// use site_scanner::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteScanner".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none()) // Redirects become references
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed requester
#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: Client,
}

impl HttpRequester {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self> {
        let client = build_http_client(config, timeout)
            .map_err(|e| ScanError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client; it should not follow redirects
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let started = Instant::now();
        let url = request.url.clone();

        let mut builder = self.client.get(url.as_str());
        if let Some(referrer) = &request.referrer {
            builder = builder.header(REFERER, referrer.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ScanError::transport(url.as_str(), &e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let stream_url = url.to_string();
        let body_stream: BodyStream = Box::pin(response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| ScanError::transport(&stream_url, &e))
        }));

        Ok(Response::new(url, status, headers, body_stream, started))
    }
}
