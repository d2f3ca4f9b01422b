//! HTML and CSS reference extraction
//!
//! This module finds every outbound reference in a document:
//! - Links and embedded resources in HTML (anchors, images, scripts, frames, forms)
//! - `meta` refresh targets
//! - `url()` and `@import` references in stylesheets, `<style>` blocks and
//!   `style` attributes
//!
//! Extraction is pure: it resolves references against the document URL (or
//! the first `<base href>`) and leaves all filtering to the link manager.

use crate::crawler::reference::{NodeKind, Reference, ReferenceSource};
use crate::url::resolve_url;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static CSS_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"));

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)@import\s+(?:url\(\s*)?(?:"([^"]*)"|'([^']*)'|([^\s'";)]+))"#)
        .expect("valid import regex")
});

static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^\s'")]+))\s*\)"#).expect("valid url regex")
});

static META_REFRESH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+\s*[;,]\s*(?:url\s*=\s*)?(.+)$").expect("valid refresh regex")
});

/// Elements whose attribute holds a single URL
const URL_ATTRIBUTES: &[(&str, NodeKind, &str)] = &[
    ("a[href]", NodeKind::Anchor, "href"),
    ("area[href]", NodeKind::Area, "href"),
    ("link[href]", NodeKind::Link, "href"),
    ("img[src]", NodeKind::Image, "src"),
    ("source[src]", NodeKind::Source, "src"),
    ("script[src]", NodeKind::Script, "src"),
    ("iframe[src]", NodeKind::Iframe, "src"),
    ("form[action]", NodeKind::Form, "action"),
    ("input[type=image][src]", NodeKind::Input, "src"),
];

/// Extracts references from an HTML document
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `page_url` - URL of the response the document came from
///
/// # Example
///
/// ```
/// use site_scanner::crawler::extract_html_references;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page#top">Link</a></body></html>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let refs = extract_html_references(html, &page);
/// assert_eq!(refs[0].url.as_str(), "https://example.com/page");
/// ```
pub fn extract_html_references(html: &str, page_url: &Url) -> Vec<Reference> {
    let document = Html::parse_document(html);
    let base = document_base(&document, page_url);
    let mut found = FoundReferences::new(page_url, &base);

    for (selector, node, attribute) in URL_ATTRIBUTES {
        for element in select(&document, selector) {
            if let Some(value) = element.value().attr(attribute) {
                found.push(value, *node, Some(*attribute));
            }
        }
    }

    // srcset holds a comma-separated list of "url descriptor" candidates
    for (selector, node) in [
        ("img[srcset]", NodeKind::Image),
        ("source[srcset]", NodeKind::Source),
    ] {
        for element in select(&document, selector) {
            let srcset = element.value().attr("srcset").unwrap_or_default();
            for candidate in srcset.split(',') {
                if let Some(url) = candidate.split_whitespace().next() {
                    found.push(url, node, Some("srcset"));
                }
            }
        }
    }

    for element in select(&document, "meta[http-equiv][content]") {
        let is_refresh = element
            .value()
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            continue;
        }
        let content = element.value().attr("content").unwrap_or_default();
        if let Some(caps) = META_REFRESH.captures(content.trim()) {
            let target = caps[1].trim().trim_matches(|c| c == '\'' || c == '"');
            found.push(target, NodeKind::MetaRefresh, Some("content"));
        }
    }

    for element in select(&document, "[style]") {
        let style = element.value().attr("style").unwrap_or_default();
        for (url, _) in find_css_urls(style) {
            found.push(&url, NodeKind::StyleAttribute, Some("style"));
        }
    }

    for element in select(&document, "style") {
        let is_css = element
            .value()
            .attr("type")
            .map_or(true, |t| t.eq_ignore_ascii_case("text/css"));
        if !is_css {
            continue;
        }
        let css: String = element.text().collect();
        for (url, _) in find_css_urls(&css) {
            found.push(&url, NodeKind::StyleElement, None);
        }
    }

    found.references
}

/// Extracts `url()` and `@import` references from a stylesheet
pub fn extract_css_references(css: &str, sheet_url: &Url) -> Vec<Reference> {
    let mut found = FoundReferences::new(sheet_url, sheet_url);
    for (url, node) in find_css_urls(css) {
        found.push(&url, node, None);
    }
    found.references
}

/// Collects references resolved against one base
struct FoundReferences<'a> {
    resource: &'a Url,
    base: &'a Url,
    references: Vec<Reference>,
}

impl<'a> FoundReferences<'a> {
    fn new(resource: &'a Url, base: &'a Url) -> Self {
        Self {
            resource,
            base,
            references: Vec::new(),
        }
    }

    fn push(&mut self, raw: &str, node: NodeKind, attribute: Option<&'static str>) {
        let raw = raw.trim();

        // Empty and same-page fragment links point back at the document itself
        if raw.is_empty() || raw.starts_with('#') {
            return;
        }

        if let Ok(url) = resolve_url(self.base, raw) {
            self.references.push(Reference::new(
                url,
                ReferenceSource {
                    node,
                    attribute,
                    resource: self.resource.clone(),
                    status: None,
                },
            ));
        }
    }
}

fn select<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Resolves the first `<base href>` against the page URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    select(document, "base[href]")
        .first()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| resolve_url(page_url, href).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Finds raw reference strings in CSS source, in document order per kind
fn find_css_urls(css: &str) -> Vec<(String, NodeKind)> {
    let css = CSS_COMMENT.replace_all(css, "");
    let mut urls = Vec::new();
    let mut import_spans = Vec::new();

    for caps in CSS_IMPORT.captures_iter(&css) {
        if let (Some(whole), Some(value)) = (caps.get(0), first_group(&caps)) {
            import_spans.push(whole.range());
            urls.push((value.to_string(), NodeKind::CssImport));
        }
    }

    for caps in CSS_URL.captures_iter(&css) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if import_spans
            .iter()
            .any(|span| span.contains(&whole.start()))
        {
            continue;
        }
        if let Some(value) = first_group(&caps) {
            urls.push((value.to_string(), NodeKind::CssUrl));
        }
    }

    urls
}

fn first_group<'t>(caps: &regex::Captures<'t>) -> Option<&'t str> {
    (1..caps.len())
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    fn urls(refs: &[Reference]) -> Vec<String> {
        refs.iter().map(|r| r.url.to_string()).collect()
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://other.com/page">A</a>
            <a href="/root">B</a>
            <a href="sibling">C</a>
        </body></html>"#;
        let refs = extract_html_references(html, &page_url());
        assert_eq!(
            urls(&refs),
            vec![
                "https://other.com/page",
                "https://example.com/root",
                "https://example.com/dir/sibling"
            ]
        );
    }

    #[test]
    fn test_fragment_stripped() {
        let html = r#"<a href="/a#frag">A</a>"#;
        let refs = extract_html_references(html, &page_url());
        assert_eq!(urls(&refs), vec!["https://example.com/a"]);
    }

    #[test]
    fn test_skip_empty_and_fragment_only() {
        let html = r##"<a href="">A</a><a href="#section">B</a><a href="   ">C</a>"##;
        let refs = extract_html_references(html, &page_url());
        assert!(refs.is_empty());
    }

    #[test]
    fn test_other_schemes_are_kept_for_the_link_manager() {
        let html = r#"<a href="mailto:test@example.com">Mail</a><a href="ftp://example.com/f">F</a>"#;
        let refs = extract_html_references(html, &page_url());
        let schemes: Vec<_> = refs.iter().map(|r| r.url.scheme().to_string()).collect();
        assert_eq!(schemes, vec!["mailto", "ftp"]);
    }

    #[test]
    fn test_source_provenance() {
        let html = r#"<img src="/logo.png">"#;
        let refs = extract_html_references(html, &page_url());
        let source = refs[0].source.as_ref().unwrap();
        assert_eq!(source.node, NodeKind::Image);
        assert_eq!(source.attribute, Some("src"));
        assert_eq!(source.resource, page_url());
        assert_eq!(source.status, None);
    }

    #[test]
    fn test_embedded_resources() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <script src="/app.js"></script>
        </head><body>
            <iframe src="/frame"></iframe>
            <form action="/search"></form>
            <input type="image" src="/button.png">
            <input type="text" src="/ignored.png">
            <map><area href="/region"></map>
        </body></html>"#;
        let found = urls(&extract_html_references(html, &page_url()));
        for expected in [
            "https://example.com/style.css",
            "https://example.com/app.js",
            "https://example.com/frame",
            "https://example.com/search",
            "https://example.com/button.png",
            "https://example.com/region",
        ] {
            assert!(found.contains(&expected.to_string()), "missing {}", expected);
        }
        assert!(!found.contains(&"https://example.com/ignored.png".to_string()));
    }

    #[test]
    fn test_srcset() {
        let html = r#"<img src="/a.png" srcset="/a-1x.png 1x, /a-2x.png 2x">"#;
        let refs = extract_html_references(html, &page_url());
        assert_eq!(
            urls(&refs),
            vec![
                "https://example.com/a.png",
                "https://example.com/a-1x.png",
                "https://example.com/a-2x.png"
            ]
        );
        assert_eq!(refs[1].source.as_ref().unwrap().attribute, Some("srcset"));
    }

    #[test]
    fn test_meta_refresh() {
        let html = r#"<meta http-equiv="Refresh" content="5; URL='/moved'">"#;
        let refs = extract_html_references(html, &page_url());
        assert_eq!(urls(&refs), vec!["https://example.com/moved"]);
        assert_eq!(refs[0].source.as_ref().unwrap().node, NodeKind::MetaRefresh);
    }

    #[test]
    fn test_meta_without_refresh_ignored() {
        let html = r#"<meta http-equiv="content-type" content="0; url=/nope">"#;
        assert!(extract_html_references(html, &page_url()).is_empty());
    }

    #[test]
    fn test_base_href() {
        let html = r#"<html><head><base href="https://cdn.example.com/assets/"></head>
            <body><img src="pic.png"><base href="https://ignored.com/"></body></html>"#;
        let refs = extract_html_references(html, &page_url());
        assert_eq!(urls(&refs), vec!["https://cdn.example.com/assets/pic.png"]);
        // Provenance is still the page itself
        assert_eq!(refs[0].source.as_ref().unwrap().resource, page_url());
    }

    #[test]
    fn test_style_attribute_and_element() {
        let html = r#"<html><head><style>
            body { background: url("/bg.png"); }
        </style><style type="text/less">.x { background: url(/less.png) }</style></head>
        <body><div style="background-image: url('/div.png')"></div></body></html>"#;
        let refs = extract_html_references(html, &page_url());
        let found = urls(&refs);
        assert!(found.contains(&"https://example.com/div.png".to_string()));
        assert!(found.contains(&"https://example.com/bg.png".to_string()));
        assert!(!found.contains(&"https://example.com/less.png".to_string()));
    }

    #[test]
    fn test_css_urls_and_imports() {
        let css = r#"
            @import "reset.css";
            @import url('theme.css') screen;
            /* url(commented.png) */
            .a { background: url(img/a.png) no-repeat; }
            .b { background: url( "img/b.png" ); }
        "#;
        let sheet = Url::parse("https://example.com/css/main.css").unwrap();
        let refs = extract_css_references(css, &sheet);

        let imports: Vec<_> = refs
            .iter()
            .filter(|r| r.source.as_ref().unwrap().node == NodeKind::CssImport)
            .map(|r| r.url.to_string())
            .collect();
        let plain: Vec<_> = refs
            .iter()
            .filter(|r| r.source.as_ref().unwrap().node == NodeKind::CssUrl)
            .map(|r| r.url.to_string())
            .collect();

        assert_eq!(
            imports,
            vec![
                "https://example.com/css/reset.css",
                "https://example.com/css/theme.css"
            ]
        );
        assert_eq!(
            plain,
            vec![
                "https://example.com/css/img/a.png",
                "https://example.com/css/img/b.png"
            ]
        );
    }

    #[test]
    fn test_no_references() {
        let html = "<html><body><p>Nothing here</p></body></html>";
        assert!(extract_html_references(html, &page_url()).is_empty());
        assert!(extract_css_references("body { color: red }", &page_url()).is_empty());
    }
}
