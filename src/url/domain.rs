use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host of the URL, or `None` when the URL has no host
/// or the host is empty (e.g. `file:///etc/hosts`, `mailto:` links).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_scanner::url::extract_domain;
///
/// let url = Url::parse("https://Sub.Example.com:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
///
/// let url = Url::parse("file:///etc/hosts").unwrap();
/// assert_eq!(extract_domain(&url), None);
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
}

/// Returns true if the scheme is one the crawler can fetch
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
