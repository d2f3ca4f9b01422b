use crate::crawler::FailurePolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Site-Scanner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches running at once
    #[serde(default = "default_parallel")]
    pub parallel: u32,

    /// What a failed fetch does to the rest of the crawl
    #[serde(rename = "failure-policy", default)]
    pub failure_policy: FailurePolicy,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            failure_policy: FailurePolicy::default(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_parallel() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where the crawl starts and which URLs it may follow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeConfig {
    /// Seed URLs
    pub seeds: Vec<String>,

    /// URL prefixes a followed link must start with (empty: no restriction)
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Domain patterns (e.g., "example.com" or "*.example.com")
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file; the crawl stays in memory when absent
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}
