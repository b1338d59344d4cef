//! Index-backed search over documents ingested out-of-band.
//!
//! This is the non-live path: a long-lived inverted index fed by local
//! ingestion (files, pasted text, crawl output), queried with full
//! required/optional/phrase semantics. The live pipeline builds its own
//! transient index and does not go through this engine.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::extract;
use crate::index::{ContentType, DocumentMeta, InvertedIndex, Posting};
use crate::search::bm25::Bm25Scorer;
use crate::search::query::{self, ParsedQuery};
use crate::search::snippet;
use crate::search::types::{SearchResult, SearchResultItem};
use crate::urls::{host_of, is_scholarly_host};

/// Stable search engine over a shared inverted index.
pub struct SearchEngine {
    index: Arc<InvertedIndex>,
    scorer: Bm25Scorer,
}

impl SearchEngine {
    /// Engine over a fresh private index.
    pub fn new() -> Self {
        Self::with_index(Arc::new(InvertedIndex::new()))
    }

    /// Engine over an existing index, shared with other ingesters.
    pub fn with_index(index: Arc<InvertedIndex>) -> Self {
        Self {
            index,
            scorer: Bm25Scorer::new(),
        }
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    /// Ingests one document. HTML content is reduced to visible text
    /// first; other content types are indexed as-is.
    pub fn index_text(&self, meta: DocumentMeta, content: &str) {
        match meta.content_type {
            ContentType::Html => {
                let base = meta
                    .url
                    .clone()
                    .unwrap_or_else(|| "http://localhost/".to_string());
                match extract::extract(content, &base) {
                    Ok(page) => {
                        let meta = if meta.title.is_empty() && !page.title.is_empty() {
                            DocumentMeta {
                                title: page.title,
                                ..meta
                            }
                        } else {
                            meta
                        };
                        self.index.add_document(meta, &page.text);
                    }
                    Err(_) => self.index.add_document(meta, content),
                }
            }
            _ => self.index.add_document(meta, content),
        }
    }

    pub fn remove(&self, doc_id: &str) {
        self.index.remove_document(doc_id);
    }

    /// Runs a query: AND over required terms, phrase filters, optional
    /// content-type filter, BM25 ranking over every query term, snippets
    /// over the stored content.
    #[instrument(skip(self), fields(top_n = top_n))]
    pub fn search(
        &self,
        raw_query: &str,
        top_n: usize,
        content_type: Option<ContentType>,
    ) -> SearchResult {
        let started = Instant::now();
        let parsed = query::parse(raw_query);
        if parsed.is_empty() {
            return SearchResult::empty(raw_query);
        }

        let mut candidates = self.collect_candidates(&parsed);
        candidates.retain(|doc_id| {
            parsed
                .required_terms
                .iter()
                .all(|term| self.index.posting(term, doc_id).is_some())
        });
        candidates.retain(|doc_id| {
            parsed
                .phrases
                .iter()
                .all(|phrase| self.phrase_matches(phrase, doc_id))
        });
        if let Some(wanted) = content_type {
            candidates.retain(|doc_id| {
                self.index
                    .document(doc_id)
                    .map(|meta| meta.content_type == wanted)
                    .unwrap_or(false)
            });
        }

        let all_terms = parsed.all_terms();
        let mut scored: Vec<(String, f64)> = candidates
            .into_iter()
            .map(|doc_id| {
                let score = self.scorer.score(&self.index, &all_terms, &doc_id);
                (doc_id, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let total_matches = scored.len();

        let items: Vec<SearchResultItem> = scored
            .into_iter()
            .take(top_n)
            .filter_map(|(doc_id, score)| self.build_item(&doc_id, score, &all_terms))
            .collect();

        SearchResult {
            query: raw_query.to_string(),
            total_matches,
            elapsed_milliseconds: started.elapsed().as_millis() as u64,
            items,
        }
    }

    /// Union of posting doc-ids across every query term, sorted so that
    /// equal-score results rank deterministically.
    fn collect_candidates(&self, parsed: &ParsedQuery) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        for term in parsed.all_terms() {
            for doc_id in self.index.postings(&term).into_keys() {
                seen.insert(doc_id);
            }
        }
        let mut candidates: Vec<String> = seen.into_iter().collect();
        candidates.sort_unstable();
        candidates
    }

    /// A document matches a phrase when some start position `s` has
    /// `phrase[i]` at `s + i` for every `i`. The first term's positions
    /// are the anchors; the rest are O(1) set lookups.
    fn phrase_matches(&self, phrase: &[String], doc_id: &str) -> bool {
        let Some(first) = phrase.first() else {
            return true;
        };
        let Some(anchor) = self.index.posting(first, doc_id) else {
            return false;
        };
        let rest: Option<Vec<Posting>> = phrase[1..]
            .iter()
            .map(|term| self.index.posting(term, doc_id))
            .collect();
        let Some(rest) = rest else {
            return false;
        };
        anchor.positions.iter().any(|&start| {
            rest.iter()
                .enumerate()
                .all(|(offset, posting)| posting.positions.contains(&(start + offset + 1)))
        })
    }

    fn build_item(&self, doc_id: &str, score: f64, terms: &[String]) -> Option<SearchResultItem> {
        let meta = self.index.document(doc_id)?;
        let content = self.index.document_content(doc_id).unwrap_or_default();
        let domain = meta.url.as_deref().and_then(host_of);
        Some(SearchResultItem {
            title: meta.title,
            url: meta.url,
            snippet: snippet::generate(&content, terms),
            score,
            source_type: meta.content_type,
            is_scholarly: domain.as_deref().is_some_and(is_scholarly_host),
            domain,
        })
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown(id: &str, title: &str) -> DocumentMeta {
        DocumentMeta::local(id, title, ContentType::Markdown)
    }

    fn engine_with(docs: &[(&str, &str, &str)]) -> SearchEngine {
        let engine = SearchEngine::new();
        for (id, title, content) in docs {
            engine.index_text(markdown(id, title), content);
        }
        engine
    }

    #[test]
    fn test_required_terms_use_and_semantics() {
        let engine = engine_with(&[
            ("a", "A", "faith seeking understanding"),
            ("b", "B", "faith alone suffices"),
        ]);
        let result = engine.search("faith understanding", 10, None);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.items[0].title, "A");
    }

    #[test]
    fn test_optional_terms_score_but_do_not_filter() {
        let engine = engine_with(&[
            ("a", "A", "grace perfects nature"),
            ("b", "B", "grace and merit cooperate"),
        ]);
        let result = engine.search("grace OR merit", 10, None);
        // Both documents carry the required term; the optional term only
        // lifts the document that has it.
        assert_eq!(result.total_matches, 2);
        assert_eq!(result.items[0].title, "B");
    }

    #[test]
    fn test_phrase_requires_adjacent_positions() {
        let engine = engine_with(&[
            ("a", "A", "natural law tradition"),
            ("b", "B", "law of nature"),
        ]);
        let result = engine.search(r#""natural law""#, 10, None);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.items[0].title, "A");
    }

    #[test]
    fn test_stemming_collapses_query_variants() {
        let engine = engine_with(&[("a", "A", "Theology and theological inquiry")]);
        let result = engine.search("theologians", 10, None);
        assert_eq!(result.total_matches, 1);
        assert!(result.items[0].score > 0.0);
    }

    #[test]
    fn test_content_type_filter() {
        let engine = SearchEngine::new();
        engine.index_text(markdown("md", "Notes"), "the doctrine of creation");
        engine.index_text(
            DocumentMeta::local("html", "Page", ContentType::Html),
            "<html><body><p>the doctrine of creation</p></body></html>",
        );
        let result = engine.search("creation", 10, Some(ContentType::Html));
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.items[0].title, "Page");
    }

    #[test]
    fn test_html_content_is_extracted_before_indexing() {
        let engine = SearchEngine::new();
        engine.index_text(
            DocumentMeta::local("page", "", ContentType::Html),
            "<html><head><title>Confessions</title><script>var x=1;</script></head>\
             <body><p>Late have I loved thee.</p></body></html>",
        );
        let result = engine.search("loved", 10, None);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.items[0].title, "Confessions");
        let none = engine.search("var", 10, None);
        assert_eq!(none.total_matches, 0);
    }

    #[test]
    fn test_empty_query_is_empty_result() {
        let engine = engine_with(&[("a", "A", "anything")]);
        let result = engine.search("", 10, None);
        assert_eq!(result.total_matches, 0);
        assert!(result.items.is_empty());
    }

    #[test]
    fn test_top_n_truncates_but_counts_all() {
        let docs: Vec<(String, String)> = (0..5)
            .map(|i| (format!("doc{}", i), format!("grace abounds {}", i)))
            .collect();
        let engine = SearchEngine::new();
        for (id, content) in &docs {
            engine.index_text(markdown(id, id), content);
        }
        let result = engine.search("grace", 2, None);
        assert_eq!(result.total_matches, 5);
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn test_snippets_highlight_matches() {
        let engine = engine_with(&[("a", "A", "Aquinas wrote on natural law in the Summa.")]);
        let result = engine.search("natural law", 10, None);
        let snippet = &result.items[0].snippet;
        assert!(snippet.contains("<mark>natural</mark>"), "{}", snippet);
        assert!(snippet.contains("<mark>law</mark>"), "{}", snippet);
    }
}
