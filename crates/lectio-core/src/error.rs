//! Error types for lectio-core.
//!
//! Per-page fetch problems are deliberately *not* errors at the pipeline
//! level: they become failed-page records and the search continues. The
//! enums here cover the cases that do propagate.

use thiserror::Error;

/// Errors raised while fetching and extracting a single page.
///
/// The live pipeline converts these into failed-page records; callers of
/// the fetch client directly (e.g. the local ingester) see them as-is.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The HTTP request failed (network error or non-success status)
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The response carried a content type the extractor cannot handle
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    /// The per-page deadline elapsed before the body was read
    #[error("Timed out after {0} seconds")]
    TimedOut(u64),
    /// robots.txt disallows fetching this path
    #[error("Disallowed by robots.txt")]
    RobotsDisallowed,
}

/// Errors raised while parsing HTML into `(title, text, links)`.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The base URL for link resolution could not be parsed
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Errors surfaced by the search pipelines.
///
/// Everything recoverable is swallowed inside the pipeline; what remains is
/// user cancellation.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The caller cancelled the request
    #[error("Search cancelled")]
    Cancelled,
}
