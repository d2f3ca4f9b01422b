/// Checks if a domain matches a scope pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: `example.com` matches only `example.com`
/// 2. Wildcard: `*.example.com` matches `example.com` and any subdomain of it
///
/// Both sides are expected to be lowercase already; the comparison itself is
/// case-sensitive.
///
/// # Examples
///
/// ```
/// use site_scanner::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|head| head.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Checks if a URL string starts with a scope prefix
///
/// The prefix is compared against the normalized URL string, so it should be
/// written in normalized form as well (lowercase scheme and host).
pub fn matches_prefix(prefix: &str, url: &str) -> bool {
    url.starts_with(prefix)
}
