//! HTTP fetching of candidate pages.
//!
//! A single pooled client is shared process-wide; per-page deadlines and
//! cancellation come from the orchestrator. A fetch never returns an
//! error to the pipeline: every outcome is a [`FetchedPage`] record, and
//! failed records carry the reason as a string.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{FETCH_TIMEOUT, FETCH_USER_AGENT};
use crate::error::FetchError;
use crate::extract;

/// Global HTTP client for connection pooling.
///
/// reqwest pools connections internally, so one client shared across all
/// fetches (and the discovery scraper, which overrides headers per
/// request) beats per-request construction. Decompression is automatic
/// and redirects are capped at five hops.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(FETCH_USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

/// Outcome of fetching one candidate URL.
///
/// `success == false` records *why* in `error`; the pipeline keeps going
/// either way.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: String,
    /// Extracted page title (empty when unavailable)
    pub title: String,
    /// Extracted visible text (empty on failure)
    pub text: String,
    pub success: bool,
    pub error: Option<String>,
}

impl FetchedPage {
    pub fn fetched(url: impl Into<String>, title: String, text: String) -> Self {
        Self {
            url: url.into(),
            title,
            text,
            success: true,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            text: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Capability seam for fetching pages; the live pipeline depends on this
/// rather than on reqwest so tests can substitute canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches and extracts one page. Must respect `deadline` (expiry is
    /// a failed page) and `cancel` (return early with a failed page; the
    /// orchestrator notices cancellation itself).
    async fn fetch(&self, url: &str, deadline: Duration, cancel: &CancellationToken)
        -> FetchedPage;
}

/// Production fetcher backed by the shared client.
pub struct HttpPageFetcher;

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(
        &self,
        url: &str,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> FetchedPage {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => {
                return FetchedPage::failed(
                    url,
                    FetchError::InvalidUrl(format!("unsupported scheme {}", parsed.scheme()))
                        .to_string(),
                )
            }
            Err(e) => {
                return FetchedPage::failed(url, FetchError::InvalidUrl(e.to_string()).to_string())
            }
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                return FetchedPage::failed(url, "cancelled");
            }
            outcome = tokio::time::timeout(deadline, fetch_and_extract(url)) => outcome,
        };

        match outcome {
            Err(_) => FetchedPage::failed(url, FetchError::TimedOut(deadline.as_secs()).to_string()),
            Ok(Err(e)) => FetchedPage::failed(url, e.to_string()),
            Ok(Ok(page)) => page,
        }
    }
}

/// The inner request: status and content-type gates, body decode, then a
/// single extractor pass.
async fn fetch_and_extract(url: &str) -> Result<FetchedPage, FetchError> {
    let response = HTTP_CLIENT
        .get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await
        .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(FetchError::RequestFailed(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.is_empty() && !content_type.starts_with("text/") && !content_type.contains("html")
    {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    // Redirects may have moved us; resolve links against where we ended up.
    let final_url = response.url().to_string();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::RequestFailed(format!("body read: {}", e)))?;
    let html = String::from_utf8(bytes.to_vec())
        .map_err(|e| FetchError::RequestFailed(format!("not valid UTF-8: {}", e)))?;

    let page = extract::extract(&html, &final_url)
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    Ok(FetchedPage::fetched(url, page.title, page.text))
}
