//! Discovered references and their provenance

use crate::storage::ReferenceRecord;
use std::fmt;
use url::Url;

/// Where in a response a reference was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Anchor,
    Area,
    Link,
    Image,
    Source,
    Script,
    Iframe,
    Form,
    Input,
    MetaRefresh,
    StyleAttribute,
    StyleElement,
    CssUrl,
    CssImport,
    LocationHeader,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchor => "a",
            Self::Area => "area",
            Self::Link => "link",
            Self::Image => "img",
            Self::Source => "source",
            Self::Script => "script",
            Self::Iframe => "iframe",
            Self::Form => "form",
            Self::Input => "input",
            Self::MetaRefresh => "meta-refresh",
            Self::StyleAttribute => "style-attribute",
            Self::StyleElement => "style-element",
            Self::CssUrl => "css-url",
            Self::CssImport => "css-import",
            Self::LocationHeader => "location-header",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSource {
    pub node: NodeKind,
    /// Attribute the URL was read from, e.g. `href`, `srcset`
    pub attribute: Option<&'static str>,
    /// URL of the response that contained the reference
    pub resource: Url,
    /// Status of that response, for redirects
    pub status: Option<u16>,
}

/// A URL discovered while crawling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Absolute URL with the fragment removed
    pub url: Url,
    /// `None` for seeds
    pub source: Option<ReferenceSource>,
}

impl Reference {
    pub fn new(url: Url, source: ReferenceSource) -> Self {
        Self {
            url,
            source: Some(source),
        }
    }

    pub fn seed(url: Url) -> Self {
        Self { url, source: None }
    }

    /// Storage row for this reference; seeds have none
    pub fn to_record(&self) -> Option<ReferenceRecord> {
        self.source.as_ref().map(|source| ReferenceRecord {
            url: self.url.to_string(),
            source_url: source.resource.to_string(),
            node: source.node.as_str().to_string(),
            attribute: source.attribute.map(str::to_string),
            status: source.status,
        })
    }
}
