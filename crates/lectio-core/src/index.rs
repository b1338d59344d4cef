//! Thread-safe inverted index with positional postings.
//!
//! The index keeps five aligned sub-structures: postings (term → document →
//! [`Posting`]), document metadata, document lengths, original contents
//! (retained for snippet generation), and a forward index from document to
//! its term set. The forward index is what makes removal O(|terms in doc|)
//! instead of a scan over every posting list.
//!
//! # Concurrency
//!
//! Sub-structures are `DashMap`s, so reads never block and always see a
//! consistent snapshot of each individual map. Mutations serialize on a
//! single write lock; a reader racing a writer may observe a partially
//! updated index across maps, but never a torn posting. The cached average
//! document length is invalidated on every mutation and recomputed lazily
//! on the next read.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::text::tokenize;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Kind of source a document was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Html,
    Markdown,
    Pdf,
}

/// Metadata for an indexed document.
///
/// The `id` is unique within an index; for web pages it is the canonical
/// URL. Reindexing under the same id replaces the record atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Unique document identifier (canonical URL for web pages)
    pub id: String,
    /// Display title
    pub title: String,
    /// Source URL, if the document came from the web
    pub url: Option<String>,
    /// Source path, if the document came from disk
    pub source_path: Option<PathBuf>,
    /// Kind of content that was ingested
    pub content_type: ContentType,
    /// Unix timestamp of the last (re)index
    pub last_indexed_at: u64,
}

impl DocumentMeta {
    /// Metadata for a fetched web page, keyed by its canonical URL.
    pub fn web(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            url: Some(id.clone()),
            id,
            title: title.into(),
            source_path: None,
            content_type: ContentType::Html,
            last_indexed_at: current_timestamp(),
        }
    }

    /// Metadata for a local document.
    pub fn local(
        id: impl Into<String>,
        title: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            source_path: None,
            content_type,
            last_indexed_at: current_timestamp(),
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// Per-(term, document) record: frequency plus the token offsets at which
/// the term occurs. Positions are a set so phrase checks are O(1) per
/// lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: String,
    pub term_frequency: usize,
    pub positions: HashSet<usize>,
}

/// Thread-safe inverted index over tokenized document contents.
#[derive(Default)]
pub struct InvertedIndex {
    /// term → (doc id → posting)
    postings: DashMap<String, HashMap<String, Posting>>,
    documents: DashMap<String, DocumentMeta>,
    doc_lengths: DashMap<String, usize>,
    doc_contents: DashMap<String, String>,
    /// Forward index: doc id → terms it contains
    doc_terms: DashMap<String, HashSet<String>>,
    /// Lazily recomputed mean of `doc_lengths`; `None` after any mutation
    avg_doc_length: RwLock<Option<f64>>,
    /// Serializes all mutations
    write_lock: Mutex<()>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `content` under `meta.id`, replacing any previous document
    /// with the same id.
    pub fn add_document(&self, meta: DocumentMeta, content: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let doc_id = meta.id.clone();
        if self.documents.contains_key(&doc_id) {
            self.remove_postings_of(&doc_id);
        }

        let tokens = tokenize(content);
        let doc_len = tokens.len();

        let mut per_term: HashMap<&str, HashSet<usize>> = HashMap::new();
        for (position, term) in tokens.iter().enumerate() {
            per_term.entry(term.as_str()).or_default().insert(position);
        }

        let mut terms_in_doc = HashSet::with_capacity(per_term.len());
        for (term, positions) in per_term {
            terms_in_doc.insert(term.to_string());
            let posting = Posting {
                doc_id: doc_id.clone(),
                term_frequency: positions.len(),
                positions,
            };
            self.postings
                .entry(term.to_string())
                .or_default()
                .insert(doc_id.clone(), posting);
        }

        self.documents.insert(doc_id.clone(), meta);
        self.doc_lengths.insert(doc_id.clone(), doc_len);
        self.doc_contents.insert(doc_id.clone(), content.to_string());
        self.doc_terms.insert(doc_id, terms_in_doc);
        self.invalidate_avg();
    }

    /// Removes a document and all its postings. A no-op for unknown ids.
    pub fn remove_document(&self, doc_id: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.documents.contains_key(doc_id) {
            return;
        }
        self.remove_postings_of(doc_id);
        self.documents.remove(doc_id);
        self.doc_lengths.remove(doc_id);
        self.doc_contents.remove(doc_id);
        self.doc_terms.remove(doc_id);
        self.invalidate_avg();
    }

    /// Resets the index to empty.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.postings.clear();
        self.documents.clear();
        self.doc_lengths.clear();
        self.doc_contents.clear();
        self.doc_terms.clear();
        self.invalidate_avg();
    }

    /// Drops the postings of one document via the forward index, leaving
    /// the other sub-structures untouched. Caller holds the write lock.
    fn remove_postings_of(&self, doc_id: &str) {
        let terms = match self.doc_terms.get(doc_id) {
            Some(terms) => terms.clone(),
            None => return,
        };
        for term in terms {
            let emptied = {
                match self.postings.get_mut(&term) {
                    Some(mut by_doc) => {
                        by_doc.remove(doc_id);
                        by_doc.is_empty()
                    }
                    None => false,
                }
            };
            if emptied {
                self.postings.remove(&term);
            }
        }
    }

    fn invalidate_avg(&self) {
        *self
            .avg_doc_length
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// All postings for a term, cloned as a snapshot. Empty for unknown
    /// terms.
    pub fn postings(&self, term: &str) -> HashMap<String, Posting> {
        self.postings
            .get(term)
            .map(|by_doc| by_doc.clone())
            .unwrap_or_default()
    }

    /// Number of documents containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map(|by_doc| by_doc.len()).unwrap_or(0)
    }

    /// O(1) access to one (term, document) posting.
    pub fn posting(&self, term: &str, doc_id: &str) -> Option<Posting> {
        self.postings
            .get(term)
            .and_then(|by_doc| by_doc.get(doc_id).cloned())
    }

    pub fn document(&self, doc_id: &str) -> Option<DocumentMeta> {
        self.documents.get(doc_id).map(|meta| meta.clone())
    }

    /// Token count of a document, or 0 for unknown ids.
    pub fn document_length(&self, doc_id: &str) -> usize {
        self.doc_lengths.get(doc_id).map(|len| *len).unwrap_or(0)
    }

    /// Original ingested text, retained for snippet generation.
    pub fn document_content(&self, doc_id: &str) -> Option<String> {
        self.doc_contents.get(doc_id).map(|content| content.clone())
    }

    pub fn all_document_ids(&self) -> Vec<String> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Arithmetic mean of document lengths, 0.0 when empty.
    ///
    /// Cached; the first read after a mutation recomputes.
    pub fn average_document_length(&self) -> f64 {
        if let Some(avg) = *self.avg_doc_length.read().unwrap_or_else(|e| e.into_inner()) {
            return avg;
        }
        let mut cache = self
            .avg_doc_length
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(avg) = *cache {
            return avg;
        }
        let count = self.doc_lengths.len();
        let avg = if count == 0 {
            0.0
        } else {
            let total: usize = self.doc_lengths.iter().map(|entry| *entry.value()).sum();
            total as f64 / count as f64
        };
        *cache = Some(avg);
        avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> DocumentMeta {
        DocumentMeta::web(id, format!("title of {}", id))
    }

    #[test]
    fn test_add_document_builds_postings_with_positions() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "natural law and natural right");

        // "and" is a stop word; positions are post-stop-word offsets.
        assert_eq!(index.document_length("doc1"), 4);
        let posting = index.posting("natur", "doc1").unwrap();
        assert_eq!(posting.term_frequency, 2);
        assert!(posting.positions.contains(&0));
        assert!(posting.positions.contains(&2));
    }

    #[test]
    fn test_term_frequency_matches_positions() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "grace grace grace nature");
        for term in ["grace", "natur"] {
            let posting = index.posting(term, "doc1").unwrap();
            assert_eq!(posting.term_frequency, posting.positions.len());
            assert!(posting.positions.iter().all(|p| *p < index.document_length("doc1")));
        }
    }

    #[test]
    fn test_reindex_is_idempotent() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "theology of grace");
        let before_len = index.document_length("doc1");
        let before_posting = index.posting("theolog", "doc1");
        let before_terms: usize = index.all_document_ids().len();

        index.add_document(meta("doc1"), "theology of grace");

        assert_eq!(index.document_count(), 1);
        assert_eq!(index.document_length("doc1"), before_len);
        assert_eq!(index.posting("theolog", "doc1"), before_posting);
        assert_eq!(index.all_document_ids().len(), before_terms);
    }

    #[test]
    fn test_reindex_replaces_old_postings() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "augustine on grace");
        index.add_document(meta("doc1"), "aquinas on virtue");

        assert!(index.posting("augustin", "doc1").is_none());
        assert_eq!(index.document_frequency("augustin"), 0);
        assert!(index.posting("aquina", "doc1").is_some());
    }

    #[test]
    fn test_remove_is_inverse_of_add() {
        let index = InvertedIndex::new();
        index.add_document(meta("keep"), "providence and fate");
        index.add_document(meta("gone"), "fate and fortune boethius");

        index.remove_document("gone");

        assert_eq!(index.document_count(), 1);
        assert!(index.document("gone").is_none());
        assert!(index.document_content("gone").is_none());
        assert_eq!(index.document_length("gone"), 0);
        // Shared term keeps the survivor's posting, unique terms vanish.
        assert_eq!(index.document_frequency("fate"), 1);
        assert_eq!(index.document_frequency("boethiu"), 0);
        assert!(index.postings("boethiu").is_empty());
    }

    #[test]
    fn test_empty_posting_maps_are_dropped() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "unique singular");
        index.remove_document("doc1");
        assert!(index.postings("uniqu").is_empty());
        assert_eq!(index.document_frequency("singular"), 0);
    }

    #[test]
    fn test_average_document_length_recomputes_lazily() {
        let index = InvertedIndex::new();
        assert_eq!(index.average_document_length(), 0.0);

        index.add_document(meta("doc1"), "one two three four");
        index.add_document(meta("doc2"), "five six");
        let avg = index.average_document_length();
        assert!((avg - 3.0).abs() < 1e-9);

        index.remove_document("doc2");
        let avg = index.average_document_length();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_resets_everything() {
        let index = InvertedIndex::new();
        index.add_document(meta("doc1"), "some text");
        index.clear();
        assert_eq!(index.document_count(), 0);
        assert!(index.all_document_ids().is_empty());
        assert_eq!(index.average_document_length(), 0.0);
    }

    #[test]
    fn test_missing_keys_read_as_zero_or_empty() {
        let index = InvertedIndex::new();
        assert!(index.postings("ghost").is_empty());
        assert_eq!(index.document_frequency("ghost"), 0);
        assert!(index.posting("ghost", "nowhere").is_none());
        assert!(index.document("nowhere").is_none());
        assert_eq!(index.document_length("nowhere"), 0);
        assert!(index.document_content("nowhere").is_none());
    }
}
