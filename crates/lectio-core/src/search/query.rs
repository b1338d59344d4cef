//! Query parsing: required terms, optional (`OR`) terms, and quoted
//! phrases.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::tokenize;

static PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("phrase pattern is valid"));

/// A parsed query.
///
/// `required_terms` use AND semantics, `optional_terms` broaden the
/// candidate set without filtering, and each phrase must occur as a
/// contiguous token run. All terms are already tokenized and stemmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub required_terms: Vec<String>,
    pub optional_terms: Vec<String>,
    pub phrases: Vec<Vec<String>>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.required_terms.is_empty() && self.optional_terms.is_empty() && self.phrases.is_empty()
    }

    /// Every term the scorer should weigh: required, optional, and the
    /// flattened phrase terms, duplicates retained.
    pub fn all_terms(&self) -> Vec<String> {
        let mut terms = self.required_terms.clone();
        terms.extend(self.optional_terms.iter().cloned());
        for phrase in &self.phrases {
            terms.extend(phrase.iter().cloned());
        }
        terms
    }
}

/// Parses a raw query string.
///
/// Quoted phrases are extracted first and replaced by a space in the
/// working string. Of the remaining whitespace-separated tokens, `AND` is
/// skipped (it is already the default), and `OR` routes the next token to
/// the optional list. Everything else goes through the tokenizer, so a
/// single raw token may contribute several terms or none at all.
pub fn parse(query: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();

    for caps in PHRASE_RE.captures_iter(query) {
        let phrase = tokenize(&caps[1]);
        if !phrase.is_empty() {
            parsed.phrases.push(phrase);
        }
    }
    let remainder = PHRASE_RE.replace_all(query, " ");

    let mut next_is_optional = false;
    for raw in remainder.split_whitespace() {
        if raw.eq_ignore_ascii_case("and") {
            continue;
        }
        if raw.eq_ignore_ascii_case("or") {
            next_is_optional = true;
            continue;
        }
        let terms = tokenize(raw);
        if next_is_optional {
            parsed.optional_terms.extend(terms);
            next_is_optional = false;
        } else {
            parsed.required_terms.extend(terms);
        }
    }
    parsed
}
