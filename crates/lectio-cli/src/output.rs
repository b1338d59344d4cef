//! Output formatting for search results.
//!
//! Human-readable terminal output by default, JSON for scripting. The
//! snippet highlight markers are rewritten to terminal bold for the
//! human format and passed through untouched in JSON.

use anyhow::Result;
use lectio_core::search::{SearchResult, SearchResultItem};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Renders a result in the requested format.
pub fn render(result: &SearchResult, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(result)?)
    } else {
        Ok(format_human(result))
    }
}

fn format_human(result: &SearchResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} results for \"{}\" ({} ms)\n",
        result.total_matches, result.query, result.elapsed_milliseconds
    ));
    for (rank, item) in result.items.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_item(rank + 1, item));
    }
    out
}

fn format_item(rank: usize, item: &SearchResultItem) -> String {
    let mut out = String::new();
    let badge = if item.is_scholarly { " [scholarly]" } else { "" };
    out.push_str(&format!(
        "{:2}. {}{}{}{}  (score {:.3})\n",
        rank, BOLD, item.title, RESET, badge, item.score
    ));
    if let Some(url) = &item.url {
        out.push_str(&format!("    {}{}{}\n", DIM, url, RESET));
    }
    if !item.snippet.is_empty() {
        let snippet = item
            .snippet
            .replace("<mark>", BOLD)
            .replace("</mark>", RESET);
        out.push_str(&format!("    {}\n", snippet));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectio_core::index::ContentType;

    fn sample() -> SearchResult {
        SearchResult {
            query: "aquinas".to_string(),
            total_matches: 1,
            elapsed_milliseconds: 12,
            items: vec![SearchResultItem {
                title: "Aquinas on law".to_string(),
                url: Some("https://jstor.org/x".to_string()),
                snippet: "On <mark>natural</mark> law.".to_string(),
                score: 1.5,
                source_type: ContentType::Html,
                is_scholarly: true,
                domain: Some("jstor.org".to_string()),
            }],
        }
    }

    #[test]
    fn test_human_format_mentions_title_and_badge() {
        let text = format_human(&sample());
        assert!(text.contains("Aquinas on law"));
        assert!(text.contains("[scholarly]"));
        assert!(text.contains("https://jstor.org/x"));
        assert!(!text.contains("<mark>"));
    }

    #[test]
    fn test_json_round_trips() {
        let rendered = render(&sample(), true).unwrap();
        let parsed: SearchResult = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.query, "aquinas");
        assert_eq!(parsed.items.len(), 1);
        assert!(parsed.items[0].snippet.contains("<mark>"));
    }
}
