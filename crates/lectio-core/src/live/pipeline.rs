//! The live-search orchestrator.
//!
//! One query runs: discovery → canonical-URL dedupe → fire-and-forget DNS
//! warm-up → semaphore-bounded parallel fetch → per-request inverted index
//! → BM25 with title and scholarly-domain boosts → snippets → ranked
//! emission. All retrieval state is owned by the request and dropped when
//! it returns; only the response cache outlives a search.
//!
//! The streaming variant emits exactly two events: `discovery` (zero-
//! scored tuples straight from the engine) strictly before `scored` (the
//! final ranking). When no page could be fetched, the scored phase falls
//! back to the discovery tuples rather than failing the caller.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{LiveSearchConfig, FETCH_USER_AGENT, SCHOLARLY_BOOST, TITLE_BOOST_WEIGHT};
use crate::error::{FetchError, SearchError};
use crate::index::{DocumentMeta, InvertedIndex};
use crate::live::cache::{CacheKey, ResponseCache, SearchMode};
use crate::live::discovery::{DiscoveryHit, DiscoverySource, DuckDuckGoDiscovery};
use crate::live::fetcher::{FetchedPage, HttpPageFetcher, PageFetcher};
use crate::live::robots::RobotsChecker;
use crate::search::bm25::Bm25Scorer;
use crate::search::snippet;
use crate::search::types::{
    SearchResult, SearchResultItem, StreamPhase, StreamedSearchEvent,
};
use crate::text::tokenize;
use crate::urls::{canonicalize, host_of, is_scholarly_host};

/// A deduplicated discovery result, keyed by its canonical URL.
#[derive(Debug, Clone)]
struct Candidate {
    canonical_url: String,
    hit: DiscoveryHit,
}

/// Per-process live search engine.
///
/// Cheap to share behind an `Arc`; each call owns its transient index.
pub struct LiveSearchEngine {
    discovery: Arc<dyn DiscoverySource>,
    fetcher: Arc<dyn PageFetcher>,
    robots: Option<Arc<RobotsChecker>>,
    scorer: Bm25Scorer,
    cache: ResponseCache,
    config: LiveSearchConfig,
}

impl LiveSearchEngine {
    /// Engine with the production discovery scraper and fetch client.
    pub fn new(config: LiveSearchConfig) -> Self {
        Self::with_sources(
            config,
            Arc::new(DuckDuckGoDiscovery::new()),
            Arc::new(HttpPageFetcher),
        )
    }

    /// Engine with injected discovery and fetch implementations.
    pub fn with_sources(
        config: LiveSearchConfig,
        discovery: Arc<dyn DiscoverySource>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let robots = config
            .respect_robots
            .then(|| Arc::new(RobotsChecker::new(FETCH_USER_AGENT)));
        Self {
            discovery,
            fetcher,
            robots,
            scorer: Bm25Scorer::new(),
            cache: ResponseCache::new(config.cache_ttl),
            config,
        }
    }

    /// Runs a complete live search and returns the ranked result.
    ///
    /// An empty query, or a query the discovery stage finds nothing for,
    /// yields an empty well-formed result. Only user cancellation is an
    /// error.
    #[instrument(skip(self, cancel), fields(top_n = top_n))]
    pub async fn search(
        &self,
        query: &str,
        top_n: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResult::empty(query));
        }

        let key = CacheKey::new(SearchMode::Live, top_n, query);
        if let Some(cached) = self.cache.get(&key) {
            debug!("response cache hit");
            return Ok(cached);
        }

        let candidates = self.discover(query, cancel).await;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if candidates.is_empty() {
            info!("discovery returned nothing");
            return Ok(finished(SearchResult::empty(query), started));
        }

        let result = self
            .fetch_and_score(query, &candidates, top_n, started, cancel)
            .await?;
        self.cache.put(key, result.clone());
        Ok(result)
    }

    /// Streaming live search: sends a `discovery` event, then a `scored`
    /// event, on `events`. A dropped receiver ends the search quietly.
    #[instrument(skip(self, events, cancel), fields(top_n = top_n))]
    pub async fn search_streamed(
        &self,
        query: &str,
        top_n: usize,
        events: mpsc::Sender<StreamedSearchEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), SearchError> {
        let started = Instant::now();
        let query = query.trim();

        let key = CacheKey::new(SearchMode::LiveStream, top_n, query);
        if let Some(cached) = self.cache.get(&key) {
            debug!("response cache hit");
            // Replay both phases from the cached ranking so the event
            // order contract holds for cached responses too.
            let discovery_result = SearchResult {
                query: cached.query.clone(),
                total_matches: cached.total_matches,
                elapsed_milliseconds: 0,
                items: cached
                    .items
                    .iter()
                    .cloned()
                    .map(|mut item| {
                        item.score = 0.0;
                        item
                    })
                    .collect(),
            };
            send_event(&events, StreamPhase::Discovery, discovery_result).await;
            send_event(&events, StreamPhase::Scored, cached).await;
            return Ok(());
        }

        let candidates = if query.is_empty() {
            Vec::new()
        } else {
            self.discover(query, cancel).await
        };
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let discovery_result = discovery_items(query, &candidates, top_n, started);
        if !send_event(&events, StreamPhase::Discovery, discovery_result).await {
            return Ok(());
        }

        if candidates.is_empty() {
            send_event(
                &events,
                StreamPhase::Scored,
                finished(SearchResult::empty(query), started),
            )
            .await;
            return Ok(());
        }

        let scored = self
            .fetch_and_score(query, &candidates, top_n, started, cancel)
            .await?;
        self.cache.put(key, scored.clone());
        send_event(&events, StreamPhase::Scored, scored).await;
        Ok(())
    }

    /// Discovery plus canonical dedupe plus DNS warm-up.
    async fn discover(&self, query: &str, cancel: &CancellationToken) -> Vec<Candidate> {
        let augmented = augment_query(query);
        let hits = self
            .discovery
            .search(&augmented, self.config.max_discovery_results, cancel)
            .await;
        debug!(hits = hits.len(), "discovery complete");

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        for hit in hits {
            let Some(canonical_url) = canonicalize(&hit.url) else {
                continue;
            };
            if seen.insert(canonical_url.clone()) {
                candidates.push(Candidate { canonical_url, hit });
            }
        }

        prefetch_dns(&candidates);
        candidates
    }

    /// The fetch/index/score/snippet phase over deduped candidates.
    async fn fetch_and_score(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_n: usize,
        started: Instant,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_fetches.max(1)));
        let mut tasks = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let robots = self.robots.clone();
            let cancel = cancel.clone();
            let deadline = self.config.per_page_timeout;
            let url = candidate.hit.url.clone();
            let canonical_url = candidate.canonical_url.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (canonical_url, FetchedPage::failed(url, "cancelled")),
                };
                if cancel.is_cancelled() {
                    return (canonical_url, FetchedPage::failed(url, "cancelled"));
                }
                if let Some(robots) = robots {
                    if let Ok(parsed) = Url::parse(&url) {
                        if !robots.is_allowed(&parsed).await {
                            return (
                                canonical_url,
                                FetchedPage::failed(
                                    url,
                                    FetchError::RobotsDisallowed.to_string(),
                                ),
                            );
                        }
                    }
                }
                let page = fetcher.fetch(&url, deadline, &cancel).await;
                (canonical_url, page)
            }));
        }

        let outcomes = futures::future::join_all(tasks).await;
        let mut pages: HashMap<String, FetchedPage> = HashMap::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Ok((canonical_url, page)) = outcome {
                if !page.success {
                    debug!(url = %page.url, error = ?page.error, "page fetch failed");
                }
                pages.insert(canonical_url, page);
            }
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        // Per-request transient index over whatever fetched cleanly.
        let index = InvertedIndex::new();
        for candidate in candidates {
            let Some(page) = pages.get(&candidate.canonical_url) else {
                continue;
            };
            if !page.success || page.text.trim().is_empty() {
                continue;
            }
            let title = if page.title.trim().is_empty() {
                candidate.hit.title.clone()
            } else {
                page.title.clone()
            };
            index.add_document(
                DocumentMeta::web(candidate.canonical_url.clone(), title),
                &page.text,
            );
        }

        if index.document_count() == 0 {
            warn!("no candidate page fetched; falling back to discovery snippets");
            return Ok(finished(
                discovery_items(query, candidates, top_n, started),
                started,
            ));
        }
        info!(
            fetched = index.document_count(),
            of = candidates.len(),
            "candidate pages indexed"
        );

        let query_tokens = tokenize(query);
        let mut scored: Vec<(&Candidate, f64)> = candidates
            .iter()
            .filter(|c| index.document(&c.canonical_url).is_some())
            .map(|c| {
                let score = self.score_document(&index, &query_tokens, &c.canonical_url);
                (c, score)
            })
            .collect();
        // Stable sort: ties keep discovery order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let total_matches = scored.len();

        let items: Vec<SearchResultItem> = scored
            .into_iter()
            .take(top_n)
            .filter_map(|(candidate, score)| {
                let meta = index.document(&candidate.canonical_url)?;
                let content = index.document_content(&candidate.canonical_url)?;
                let domain = host_of(&candidate.canonical_url);
                Some(SearchResultItem {
                    title: meta.title,
                    url: Some(candidate.canonical_url.clone()),
                    snippet: snippet::generate(&content, &query_tokens),
                    score,
                    source_type: meta.content_type,
                    is_scholarly: domain.as_deref().is_some_and(is_scholarly_host),
                    domain,
                })
            })
            .collect();

        Ok(finished(
            SearchResult {
                query: query.to_string(),
                total_matches,
                elapsed_milliseconds: 0,
                items,
            },
            started,
        ))
    }

    /// BM25 plus the title-overlap and scholarly-domain multipliers.
    fn score_document(
        &self,
        index: &InvertedIndex,
        query_tokens: &[String],
        doc_id: &str,
    ) -> f64 {
        let mut score = self.scorer.score(index, query_tokens, doc_id);

        if let Some(meta) = index.document(doc_id) {
            let distinct_query: HashSet<&String> = query_tokens.iter().collect();
            if !distinct_query.is_empty() {
                let title_tokens: HashSet<String> = tokenize(&meta.title).into_iter().collect();
                let overlap = distinct_query
                    .iter()
                    .filter(|t| title_tokens.contains(t.as_str()))
                    .count();
                if overlap > 0 {
                    score *= 1.0
                        + TITLE_BOOST_WEIGHT * overlap as f64 / distinct_query.len() as f64;
                }
            }
        }

        if host_of(doc_id).is_some_and(|h| is_scholarly_host(&h)) {
            score *= SCHOLARLY_BOOST;
        }
        score
    }
}

/// Appends the scholarly-bias suffix unless the query already signals a
/// scholarly intent or carries a `site:` operator.
fn augment_query(query: &str) -> String {
    let lower = query.to_lowercase();
    let already_biased = ["scholar", "academic", "journal", "paper"]
        .iter()
        .any(|t| lower.contains(t))
        || lower.contains("site:");
    if already_biased {
        query.to_string()
    } else {
        format!("{} scholarly theology philosophy", query)
    }
}

/// Resolves every distinct candidate host in the background so sockets
/// connect against a warm DNS cache. Lookup failures are irrelevant.
fn prefetch_dns(candidates: &[Candidate]) {
    let hosts: HashSet<String> = candidates
        .iter()
        .filter_map(|c| host_of(&c.hit.url))
        .collect();
    for host in hosts {
        tokio::spawn(async move {
            let _ = tokio::net::lookup_host((host.as_str(), 443)).await;
        });
    }
}

/// Builds the zero-scored result used for the discovery phase and for the
/// all-fetches-failed fallback.
fn discovery_items(
    query: &str,
    candidates: &[Candidate],
    top_n: usize,
    started: Instant,
) -> SearchResult {
    let items: Vec<SearchResultItem> = candidates
        .iter()
        .take(top_n)
        .map(|candidate| {
            let domain = host_of(&candidate.canonical_url);
            SearchResultItem {
                title: candidate.hit.title.clone(),
                url: Some(candidate.canonical_url.clone()),
                snippet: candidate.hit.snippet.clone(),
                score: 0.0,
                source_type: crate::index::ContentType::Html,
                is_scholarly: domain.as_deref().is_some_and(is_scholarly_host),
                domain,
            }
        })
        .collect();
    finished(
        SearchResult {
            query: query.to_string(),
            total_matches: candidates.len(),
            elapsed_milliseconds: 0,
            items,
        },
        started,
    )
}

fn finished(mut result: SearchResult, started: Instant) -> SearchResult {
    result.elapsed_milliseconds = started.elapsed().as_millis() as u64;
    result
}

/// Sends one streamed event; returns false when the receiver is gone.
async fn send_event(
    events: &mpsc::Sender<StreamedSearchEvent>,
    phase: StreamPhase,
    result: SearchResult,
) -> bool {
    events
        .send(StreamedSearchEvent { phase, result })
        .await
        .is_ok()
}
