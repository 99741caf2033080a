use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use copyvio_http::HttpError;

/// The search engines this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchEngineKind {
    YahooBoss,
}

impl SearchEngineKind {
    pub const ALL: [SearchEngineKind; 1] = [SearchEngineKind::YahooBoss];

    /// Display name, as written in configuration.
    pub fn name(self) -> &'static str {
        match self {
            SearchEngineKind::YahooBoss => "Yahoo! BOSS",
        }
    }

    fn alias(self) -> &'static str {
        match self {
            SearchEngineKind::YahooBoss => "yahoo_boss",
        }
    }
}

impl fmt::Display for SearchEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchEngineKind {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(wanted) || kind.alias().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| SearchError::UnknownEngine(wanted.to_string()))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("{engine} error: got response code '{status}':\n{body}")]
    Status {
        engine: &'static str,
        status: u16,
        body: String,
    },

    #[error("{engine} error: JSON could not be decoded: {reason}")]
    Decode { engine: &'static str, reason: String },

    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("gzip response could not be decompressed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("unknown search engine: {0}")]
    UnknownEngine(String),
}

impl SearchError {
    /// True for the failures that mean "the provider could not be queried
    /// successfully": blank query, non-200 status, undecodable payload.
    /// Transport, decompression, and selection faults are passed through as
    /// their own kinds.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            SearchError::EmptyQuery | SearchError::Status { .. } | SearchError::Decode { .. }
        )
    }
}

/// A web search provider that turns a text fragment into ranked candidate URLs.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    fn kind(&self) -> SearchEngineKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Search for `query` as an exact phrase.
    ///
    /// Returns URLs in provider rank order. An empty list is a valid answer.
    /// Issues exactly one request to the provider per call.
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}
