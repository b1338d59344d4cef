//! Text analysis: tokenization, stop-word removal, and stemming.
//!
//! Every piece of text that enters the index, and every query, goes through
//! [`tokenize`] so that postings and query terms live in the same token
//! space.

mod stemmer;
mod stopwords;

pub use stemmer::stem;
pub use stopwords::is_stop_word;

/// Tokenizes text into index terms.
///
/// Lowercases, splits on anything outside `[a-z0-9-]`, drops empty tokens
/// and stop words, and stems what remains. The output order follows the
/// input; token offsets in the returned sequence are the positions recorded
/// in postings.
///
/// # Example
///
/// ```
/// use lectio_core::text::tokenize;
///
/// let terms = tokenize("The Theology of Aquinas");
/// assert_eq!(terms, vec!["theolog", "aquina"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
        .filter(|t| !t.is_empty() && !is_stop_word(t))
        .map(stem)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        let tokens = tokenize("Natural Law, Tradition!");
        assert_eq!(tokens, vec!["natur", "law", "tradit"]);
    }

    #[test]
    fn test_tokenize_drops_stop_words() {
        let tokens = tokenize("the law of the land");
        assert_eq!(tokens, vec!["law", "land"]);
    }

    #[test]
    fn test_tokenize_keeps_digits_and_hyphens() {
        let tokens = tokenize("summa 1265 neo-platonism");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], "1265");
        assert!(tokens[2].starts_with("neo-"));
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_query_and_document_share_token_space() {
        let doc = tokenize("Theology and theological inquiry");
        let query = tokenize("theologians");
        assert!(doc.contains(&query[0]));
    }
}
