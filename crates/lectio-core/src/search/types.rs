//! Result model shared by the indexed and live search paths.

use serde::{Deserialize, Serialize};

use crate::index::ContentType;

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    /// Page or document title
    pub title: String,
    /// Canonical URL for web results, absent for local documents
    pub url: Option<String>,
    /// Excerpt with `<mark>…</mark>` highlight markers
    pub snippet: String,
    /// Final relevance score after boosts
    pub score: f64,
    /// What kind of source the hit came from
    pub source_type: ContentType,
    /// Whether the host is in the scholarly-domain set
    pub is_scholarly: bool,
    /// Host with any leading `www.` stripped, absent for local documents
    pub domain: Option<String>,
}

/// A completed search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The query as the user submitted it
    pub query: String,
    /// Number of documents that matched before truncation to top-N
    pub total_matches: usize,
    /// Wall-clock time spent producing the result
    pub elapsed_milliseconds: u64,
    /// Ranked hits, best first
    pub items: Vec<SearchResultItem>,
}

impl SearchResult {
    /// A well-formed result with no hits.
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            total_matches: 0,
            elapsed_milliseconds: 0,
            items: Vec::new(),
        }
    }
}

/// Phase marker for the two-event streaming surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    /// Immediate results assembled from discovery tuples, zero-scored
    Discovery,
    /// Final ranked results after fetching and scoring
    Scored,
}

impl StreamPhase {
    /// Wire name of the phase, as used in the SSE `event:` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Discovery => "discovery",
            StreamPhase::Scored => "scored",
        }
    }
}

/// One event of the streaming live search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamedSearchEvent {
    pub phase: StreamPhase,
    pub result: SearchResult,
}
