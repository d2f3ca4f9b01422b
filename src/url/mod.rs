//! URL handling module for Site-Scanner
//!
//! This module provides URL normalization, domain extraction, wildcard
//! matching, and the scope allow-list used to keep a crawl on one site.

mod domain;
mod matcher;
mod normalize;

use crate::config::ScopeConfig;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_http_scheme};
pub use matcher::{matches_prefix, matches_wildcard};
pub use normalize::{normalize_url, resolve_url};

/// Allow-list of URL prefixes and domain patterns
///
/// An empty list places no restriction. When both lists are set a URL must
/// satisfy both.
#[derive(Debug, Clone, Default)]
pub struct UrlScope {
    prefixes: Vec<String>,
    domains: Vec<String>,
}

impl UrlScope {
    /// Creates a scope from prefix and domain pattern lists
    pub fn new(prefixes: Vec<String>, domains: Vec<String>) -> Self {
        Self {
            prefixes,
            domains: domains.into_iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    /// Builds the scope described by the `[scope]` config section
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(config.prefixes.clone(), config.domains.clone())
    }

    /// Returns true if neither list restricts anything
    pub fn is_unrestricted(&self) -> bool {
        self.prefixes.is_empty() && self.domains.is_empty()
    }

    /// Checks a normalized URL against the scope
    ///
    /// # Examples
    ///
    /// ```
    /// use site_scanner::url::UrlScope;
    /// use url::Url;
    ///
    /// let scope = UrlScope::new(vec![], vec!["*.example.com".to_string()]);
    /// assert!(scope.allows(&Url::parse("https://blog.example.com/").unwrap()));
    /// assert!(!scope.allows(&Url::parse("https://example.org/").unwrap()));
    /// ```
    pub fn allows(&self, url: &Url) -> bool {
        let prefix_ok = self.prefixes.is_empty()
            || self
                .prefixes
                .iter()
                .any(|prefix| matches_prefix(prefix, url.as_str()));

        if !prefix_ok {
            return false;
        }

        if self.domains.is_empty() {
            return true;
        }

        match extract_domain(url) {
            Some(domain) => self
                .domains
                .iter()
                .any(|pattern| matches_wildcard(pattern, &domain)),
            None => false,
        }
    }
}
