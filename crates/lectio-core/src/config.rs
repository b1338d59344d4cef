//! Configuration for the live-search pipeline.
//!
//! The constants here are the tuning points shared by the retrieval engine
//! and the orchestrator; [`LiveSearchConfig`] carries the per-deployment
//! knobs with their production defaults.

use std::time::Duration;

/// BM25 term-frequency saturation parameter.
pub const BM25_K1: f64 = 1.2;

/// BM25 document-length normalization parameter.
pub const BM25_B: f64 = 0.75;

/// Snippet window width in characters.
pub const SNIPPET_WINDOW_SIZE: usize = 280;

/// Step between candidate snippet windows, in characters.
pub const SNIPPET_STEP_SIZE: usize = 40;

/// Multiplier applied to a document whose host is in the scholarly set.
pub const SCHOLARLY_BOOST: f64 = 1.5;

/// Maximum fraction added by the title boost (`1 + 0.3 * overlap`).
pub const TITLE_BOOST_WEIGHT: f64 = 0.3;

/// Timeout for the discovery HTTP request.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a robots.txt probe.
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(3);

/// Default timeout for the shared fetch client; the orchestrator overrides
/// it with the tighter per-page deadline.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent presented to the discovery endpoint. Mimics a common desktop
/// browser; the endpoint serves degraded markup to unknown agents.
pub const DISCOVERY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Identifying user agent for candidate-page fetches and robots probes.
pub const FETCH_USER_AGENT: &str = "lectio/0.1 (scholarly meta-search; +https://github.com/lectio-search/lectio)";

/// Knobs for one `LiveSearchEngine` instance.
#[derive(Debug, Clone)]
pub struct LiveSearchConfig {
    /// Upper bound on discovery tuples requested per query
    pub max_discovery_results: usize,
    /// Maximum candidate-page fetches in flight at once
    pub max_parallel_fetches: usize,
    /// Per-page fetch deadline; a miss yields a failed page, not an abort
    pub per_page_timeout: Duration,
    /// Gate candidate fetches through a robots.txt checker
    pub respect_robots: bool,
    /// How long finished results stay in the response cache
    pub cache_ttl: Duration,
}

impl Default for LiveSearchConfig {
    fn default() -> Self {
        Self {
            max_discovery_results: 50,
            max_parallel_fetches: 8,
            per_page_timeout: Duration::from_secs(10),
            respect_robots: false,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_tuning() {
        let config = LiveSearchConfig::default();
        assert_eq!(config.max_discovery_results, 50);
        assert_eq!(config.max_parallel_fetches, 8);
        assert_eq!(config.per_page_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(!config.respect_robots);
    }
}
