//! Snippet generation with best-window selection and term highlighting.
//!
//! The generator slides a fixed-width window over the document, scores
//! each window by `1000 * distinct-terms + total-hits`, snaps the winner
//! to word boundaries, and wraps query-term occurrences in
//! `<mark>…</mark>`. The highlight pass is a single combined regex; the
//! `regex` crate's linear-time engine keeps it bounded on pathological
//! input, and a failed pattern build falls back to the plain snippet.

use regex::Regex;

use crate::config::{SNIPPET_STEP_SIZE, SNIPPET_WINDOW_SIZE};

/// Builds a highlighted excerpt of `text` for the given query terms.
///
/// Matching is case-insensitive and substring-based, so stemmed terms
/// (`natur`) still hit their surface forms (`natural`), and the highlight
/// extends across the rest of the word. With no occurrences at all, the
/// head of the document is returned instead.
pub fn generate(text: &str, query_terms: &[String]) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let lower = text.to_lowercase();
    let terms = distinct_lowercase(query_terms);

    // Every occurrence of every distinct term, as (byte offset, term index).
    let mut hits: Vec<(usize, usize)> = Vec::new();
    for (term_idx, term) in terms.iter().enumerate() {
        for (pos, _) in lower.match_indices(term.as_str()) {
            hits.push((pos, term_idx));
        }
    }

    if hits.is_empty() {
        return head_of(text);
    }
    hits.sort_unstable();

    let (start, end) = best_window(&hits, terms.len(), text.len());
    let (start, end) = snap_to_word_boundaries(&lower, start, end);
    let start = floor_char_boundary(text, start);
    let end = floor_char_boundary(text, end.max(start));

    let core = &text[start..end];
    let highlighted = highlight(core, &terms);

    let mut snippet = String::with_capacity(highlighted.len() + 6);
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(&highlighted);
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

/// Lowercased terms with duplicates and empties dropped, order preserved.
fn distinct_lowercase(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let lower = term.to_lowercase();
        if !lower.is_empty() && !out.contains(&lower) {
            out.push(lower);
        }
    }
    out
}

/// First window of the document, with a trailing ellipsis if truncated.
fn head_of(text: &str) -> String {
    if text.len() <= SNIPPET_WINDOW_SIZE {
        return text.to_string();
    }
    let cut = floor_char_boundary(text, SNIPPET_WINDOW_SIZE);
    format!("{}...", &text[..cut])
}

/// Scans windows of `SNIPPET_WINDOW_SIZE` bytes in `SNIPPET_STEP_SIZE`
/// steps and returns the best-scoring `(start, end)`.
///
/// Window score is `1000 * distinct + hits`; ties go to the earlier
/// window. `hits` must be sorted by position.
fn best_window(hits: &[(usize, usize)], term_count: usize, len: usize) -> (usize, usize) {
    if len <= SNIPPET_WINDOW_SIZE {
        return (0, len);
    }

    let mut best = (0, SNIPPET_WINDOW_SIZE.min(len));
    let mut best_score = 0usize;
    let mut seen = vec![false; term_count];

    let mut start = 0;
    loop {
        let end = (start + SNIPPET_WINDOW_SIZE).min(len);

        seen.iter_mut().for_each(|s| *s = false);
        let mut distinct = 0usize;
        let mut total = 0usize;
        // Binary search to the first hit inside the window, then walk.
        let first = hits.partition_point(|&(pos, _)| pos < start);
        for &(pos, term_idx) in &hits[first..] {
            if pos >= end {
                break;
            }
            total += 1;
            if !seen[term_idx] {
                seen[term_idx] = true;
                distinct += 1;
            }
        }

        let score = 1000 * distinct + total;
        if score > best_score {
            best_score = score;
            best = (start, end);
        }

        if start + SNIPPET_WINDOW_SIZE >= len {
            break;
        }
        start += SNIPPET_STEP_SIZE;
    }
    best
}

/// Nudges the window edges onto spaces: the start forward past the next
/// space within 30 bytes, the end back to the last space within 30 bytes,
/// never crossing below `start`.
fn snap_to_word_boundaries(lower: &str, mut start: usize, mut end: usize) -> (usize, usize) {
    const SNAP: usize = 30;
    if start > 0 {
        let probe_end = (start + SNAP).min(lower.len());
        if let Some(offset) = lower
            .as_bytes()
            .get(start..probe_end)
            .and_then(|w| w.iter().position(|&b| b == b' '))
        {
            start += offset + 1;
        }
    }
    if end < lower.len() {
        let probe_start = end.saturating_sub(SNAP);
        if let Some(offset) = lower
            .as_bytes()
            .get(probe_start..end)
            .and_then(|w| w.iter().rposition(|&b| b == b' '))
        {
            let candidate = probe_start + offset;
            if candidate > start {
                end = candidate;
            }
        }
    }
    (start, end.max(start))
}

/// Wraps every term occurrence, plus any word characters continuing it,
/// in `<mark>` tags. One combined case-insensitive pass.
fn highlight(core: &str, terms: &[String]) -> String {
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?i)({})\w*", alternation);
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(core, |caps: &regex::Captures<'_>| {
                format!("<mark>{}</mark>", &caps[0])
            })
            .into_owned(),
        // A pattern that fails to build costs the highlights, not the result.
        Err(_) => core.to_string(),
    }
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_highlights_each_query_term_once() {
        let snippet = generate(
            "Aquinas wrote on natural law in the Summa.",
            &terms(&["natural", "law"]),
        );
        assert!(snippet.contains("<mark>natural</mark>"), "{}", snippet);
        assert!(snippet.contains("<mark>law</mark>"), "{}", snippet);
        assert_eq!(snippet.matches("<mark>").count(), 2);
    }

    #[test]
    fn test_stemmed_term_highlights_surface_form() {
        let snippet = generate("A question of theology.", &terms(&["theolog"]));
        assert!(snippet.contains("<mark>theology</mark>"), "{}", snippet);
    }

    #[test]
    fn test_no_occurrences_returns_head() {
        let text = "Short document with no matches.";
        assert_eq!(generate(text, &terms(&["absent"])), text);
    }

    #[test]
    fn test_no_occurrences_long_document_truncates_with_ellipsis() {
        let text = "word ".repeat(200);
        let snippet = generate(&text, &terms(&["absent"]));
        assert!(snippet.ends_with("..."));
        assert!(snippet.len() <= SNIPPET_WINDOW_SIZE + 3);
    }

    #[test]
    fn test_picks_window_with_most_distinct_terms() {
        // "law" early and alone; "natural law" together much later.
        let filler = "x".repeat(SNIPPET_WINDOW_SIZE * 2);
        let text = format!("law alone here {} and then natural law together", filler);
        let snippet = generate(&text, &terms(&["natural", "law"]));
        assert!(snippet.contains("<mark>natural</mark>"), "{}", snippet);
        assert!(snippet.starts_with("..."));
    }

    #[test]
    fn test_window_score_prefers_distinct_over_repeats() {
        let hits = vec![(0, 0), (10, 0), (20, 0), (500, 0), (510, 1)];
        let (start, _) = best_window(&hits, 2, 800);
        assert!(start > 0, "window with two distinct terms should win");
    }

    #[test]
    fn test_ellipses_mark_interior_windows() {
        let text = format!("{} natural law {}", "a ".repeat(400), "b ".repeat(400));
        let snippet = generate(&text, &terms(&["natural", "law"]));
        assert!(snippet.starts_with("..."), "{}", snippet);
        assert!(snippet.ends_with("..."), "{}", snippet);
        assert!(snippet.contains("<mark>natural</mark>"));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(generate("", &terms(&["x"])), "");
        let text = "Some text.";
        assert_eq!(generate(text, &[]), text);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "καθολικός θεός — natural law καὶ φύσις ".repeat(30);
        let snippet = generate(&text, &terms(&["natural", "law"]));
        assert!(snippet.contains("<mark>"));
    }
}
