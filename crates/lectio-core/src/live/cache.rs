//! Bounded-TTL memoization of finished search results.
//!
//! Keys combine the search mode, the requested result count, and the
//! normalized (trimmed, lowercased) query, so `Live` and `Local` lookups
//! never shadow each other. Entries expire after the configured TTL and
//! are dropped on the read that finds them stale.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::search::types::SearchResult;

/// Which pipeline produced a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Live,
    LiveStream,
    Local,
}

/// Cache key: `(mode, topN, normalized query)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    mode: SearchMode,
    top_n: usize,
    query: String,
}

impl CacheKey {
    pub fn new(mode: SearchMode, top_n: usize, query: &str) -> Self {
        Self {
            mode,
            top_n,
            query: query.trim().to_lowercase(),
        }
    }
}

struct CachedEntry {
    stored_at: Instant,
    result: SearchResult,
}

/// Thread-safe TTL cache for [`SearchResult`]s.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CachedEntry>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns a clone of the cached result, dropping it if stale.
    pub fn get(&self, key: &CacheKey) -> Option<SearchResult> {
        let fresh = match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => None,
            None => return None,
        };
        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    /// Stores a result, replacing any previous entry, and sheds whatever
    /// else has expired.
    pub fn put(&self, key: CacheKey, result: SearchResult) {
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        self.entries.insert(
            key,
            CachedEntry {
                stored_at: Instant::now(),
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
