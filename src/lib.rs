//! Site-Scanner: a bounded-parallel site graph crawler
//!
//! This crate fetches a seed resource, extracts outbound references from each
//! response and recursively schedules unvisited references for fetch, with a
//! concurrency cap, exactly-once dedup and a per-response chain of actions.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Scanner operations
///
/// Errors are `Clone` so that one task failure can settle both the task's own
/// completion future and a queue's aggregate drain signal.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("Task is not invocable")]
    NotInvocable,

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Pipeline step '{step}' failed: {message}")]
    PipelineStep { step: String, message: String },

    #[error("Location header missing for {status} response from {url}")]
    MissingLocationHeader { url: String, status: u16 },

    #[error("Link filter error: {0}")]
    Filter(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Queue is closed")]
    QueueClosed,

    #[error("Task aborted after an earlier failure")]
    Aborted,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Task was dropped before completing")]
    Cancelled,

    #[error("No seed URL was accepted")]
    NoSeedsAccepted,
}

impl ScanError {
    /// Builds a transport error from a reqwest failure, classifying the
    /// common network conditions
    pub fn transport(url: &str, error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else {
            error.to_string()
        };

        Self::Transport {
            url: url.to_string(),
            message,
        }
    }

    /// Builds a pipeline step error for custom actions
    pub fn step(step: &str, message: impl Into<String>) -> Self {
        Self::PipelineStep {
            step: step.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Relative URL without a base: {0}")]
    Relative(String),

    #[error("Missing domain in URL: {0}")]
    MissingDomain(String),
}

pub use storage::StoreError;

/// Result type alias for Site-Scanner operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, LinkManager, Pipeline, Reference};
pub use state::LinkState;
pub use url::{extract_domain, normalize_url};
