use crate::{UrlError, UrlResult};
use url::{ParseError, Url};

/// Normalizes a URL into its dedup identity
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Parse the URL; the parser lowercases the scheme and host and drops
///    default ports
/// 3. Remove the fragment (everything after #)
///
/// Path, query and trailing slashes are left untouched: two URLs that differ
/// only there are different resources.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - The string is relative, has an empty host, or is malformed
///
/// # Examples
///
/// ```
/// use site_scanner::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a#frag").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let trimmed = url_str.trim();

    let mut url = Url::parse(trimmed).map_err(|e| match e {
        ParseError::RelativeUrlWithoutBase => UrlError::Relative(trimmed.to_string()),
        ParseError::EmptyHost => UrlError::MissingDomain(trimmed.to_string()),
        other => UrlError::Parse(format!("{}: {}", trimmed, other)),
    })?;

    url.set_fragment(None);

    Ok(url)
}

/// Resolves a possibly relative reference against a base URL
///
/// The fragment is removed from the result.
///
/// # Returns
///
/// * `Ok(Url)` - The absolute, fragment-free URL
/// * `Err(UrlError)` - The reference cannot be resolved
pub fn resolve_url(base: &Url, href: &str) -> UrlResult<Url> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    url.set_fragment(None);
    Ok(url)
}
