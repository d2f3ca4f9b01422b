/// Link admission outcomes for the link manager
use std::fmt;

/// Outcome of offering one candidate link to the link manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Scheme is not http or https, or the candidate is not an absolute URL
    WrongProtocol,

    /// URL has an empty or missing host
    NoDomain,

    /// Rejected by the configured link filter
    Filtered,

    /// Already queued earlier in this crawl (or a previous one sharing the store)
    Visited,

    /// Newly marked queued and dispatched for fetch
    Added,
}

impl LinkState {
    /// Returns true if the link was dispatched for fetch
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }

    /// Returns true if the candidate was rejected before the dedup check
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::WrongProtocol | Self::NoDomain | Self::Filtered)
    }

    /// Short lowercase name, used in logs and stats output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongProtocol => "wrong_protocol",
            Self::NoDomain => "no_domain",
            Self::Filtered => "filtered",
            Self::Visited => "visited",
            Self::Added => "added",
        }
    }

    /// Returns all link states in check order
    pub fn all_states() -> [Self; 5] {
        [
            Self::WrongProtocol,
            Self::NoDomain,
            Self::Filtered,
            Self::Visited,
            Self::Added,
        ]
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
