//! Okapi BM25 scoring over the inverted index.
//!
//! The scorer is stateless; corpus statistics come from the index at call
//! time, so the same scorer works against the long-lived local index and
//! the per-request transient index alike.

use crate::config::{BM25_B, BM25_K1};
use crate::index::InvertedIndex;

/// Okapi BM25 with configurable saturation (`k1`) and length
/// normalization (`b`).
///
/// For each query term `t` and document `d`:
///
/// ```text
/// idf(t)   = ln((N - n + 0.5) / (n + 0.5) + 1)
/// tf_norm  = tf * (k1 + 1) / (tf + k1 * (1 - b + b * dl / avgdl))
/// score(d) = Σ_t idf(t) * tf_norm
/// ```
///
/// IDF may go negative for terms present in more than half the corpus;
/// such terms legitimately pull the score down.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    k1: f64,
    b: f64,
}

impl Bm25Scorer {
    pub fn new() -> Self {
        Self { k1: BM25_K1, b: BM25_B }
    }

    pub fn with_params(k1: f64, b: f64) -> Self {
        Self { k1, b }
    }

    /// Scores one document against the query terms.
    ///
    /// Duplicate terms in `terms` each contribute, which is what gives
    /// repeated phrase terms their extra weight. Terms absent from the
    /// corpus contribute 0. Returns 0.0 for an empty corpus.
    pub fn score(&self, index: &InvertedIndex, terms: &[String], doc_id: &str) -> f64 {
        let total_docs = index.document_count();
        let avg_doc_len = index.average_document_length();
        if total_docs == 0 || avg_doc_len == 0.0 {
            return 0.0;
        }
        let doc_len = index.document_length(doc_id) as f64;

        let mut score = 0.0;
        for term in terms {
            let doc_freq = index.document_frequency(term);
            if doc_freq == 0 {
                continue;
            }
            let posting = match index.posting(term, doc_id) {
                Some(posting) => posting,
                None => continue,
            };
            let n = doc_freq as f64;
            let big_n = total_docs as f64;
            let idf = ((big_n - n + 0.5) / (n + 0.5) + 1.0).ln();
            let tf = posting.term_frequency as f64;
            let tf_norm = tf * (self.k1 + 1.0)
                / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_doc_len));
            score += idf * tf_norm;
        }
        score
    }
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentMeta;
    use crate::text::tokenize;

    fn indexed(docs: &[(&str, &str)]) -> InvertedIndex {
        let index = InvertedIndex::new();
        for (id, content) in docs {
            index.add_document(DocumentMeta::web(*id, *id), content);
        }
        index
    }

    #[test]
    fn test_empty_index_scores_zero() {
        let index = InvertedIndex::new();
        let scorer = Bm25Scorer::new();
        assert_eq!(scorer.score(&index, &tokenize("anything"), "doc"), 0.0);
    }

    #[test]
    fn test_matching_document_scores_positive() {
        let index = indexed(&[
            ("a", "Theology and theological inquiry"),
            ("b", "completely unrelated text about gardening"),
        ]);
        let scorer = Bm25Scorer::new();
        let terms = tokenize("theologians");
        assert!(scorer.score(&index, &terms, "a") > 0.0);
        assert_eq!(scorer.score(&index, &terms, "b"), 0.0);
    }

    #[test]
    fn test_rarer_term_weighs_more() {
        let index = indexed(&[
            ("a", "grace rare grace common"),
            ("b", "grace common filler words here"),
            ("c", "grace common filler words here"),
        ]);
        let scorer = Bm25Scorer::new();
        let rare = scorer.score(&index, &tokenize("rare"), "a");
        let common = scorer.score(&index, &tokenize("grace"), "a");
        assert!(rare > common, "rare={} common={}", rare, common);
    }

    #[test]
    fn test_higher_tf_scores_higher_at_equal_length() {
        let index = indexed(&[
            ("a", "virtue virtue virtue habit habit justice"),
            ("b", "virtue habit habit justice justice justice"),
        ]);
        let scorer = Bm25Scorer::new();
        let terms = tokenize("virtue");
        assert!(scorer.score(&index, &terms, "a") > scorer.score(&index, &terms, "b"));
    }

    #[test]
    fn test_idf_positive_terms_never_negative() {
        // Every query term appears in fewer than half the documents.
        let index = indexed(&[
            ("a", "esse essence act"),
            ("b", "potency act form"),
            ("c", "matter form substance"),
            ("d", "accident substance nine"),
            ("e", "one two three"),
        ]);
        let scorer = Bm25Scorer::new();
        for id in ["a", "b", "c", "d", "e"] {
            let score = scorer.score(&index, &tokenize("esse potency matter"), id);
            assert!(score >= 0.0, "doc {} scored {}", id, score);
        }
    }

    #[test]
    fn test_duplicate_query_terms_double_contribution() {
        let index = indexed(&[("a", "law and gospel"), ("b", "gospel alone")]);
        let scorer = Bm25Scorer::new();
        let single = scorer.score(&index, &tokenize("law"), "a");
        let double = scorer.score(&index, &["law".to_string(), "law".to_string()], "a");
        assert!((double - 2.0 * single).abs() < 1e-9);
    }
}
