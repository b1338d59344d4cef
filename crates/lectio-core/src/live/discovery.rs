//! Candidate discovery by scraping the DuckDuckGo HTML endpoint.
//!
//! Page 1 is a plain GET; page 2 replays the hidden fields of the "Next"
//! form as a POST. The markup embeds real destination URLs in a `uddg`
//! redirect parameter. Result nodes are located by substring checks on
//! the `class` attribute, since the endpoint's class names carry version
//! suffixes that change without notice.
//!
//! Discovery never raises: any network or parse failure ends pagination
//! and returns what was collected.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::{DISCOVERY_TIMEOUT, DISCOVERY_USER_AGENT};
use crate::live::fetcher::HTTP_CLIENT;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("valid selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static FORM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("form").expect("valid selector"));
static INPUT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input").expect("valid selector"));

/// One discovery tuple: destination URL plus the engine's own title and
/// snippet for it.
#[derive(Debug, Clone)]
pub struct DiscoveryHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Capability seam for candidate discovery.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Returns up to `max_results` hits, duplicates suppressed, never
    /// erroring. `cancel` must be observed at the request suspension
    /// points; a cancelled search returns whatever was collected.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Vec<DiscoveryHit>;
}

/// Production discovery against the DuckDuckGo HTML endpoint.
#[derive(Default)]
pub struct DuckDuckGoDiscovery;

impl DuckDuckGoDiscovery {
    pub fn new() -> Self {
        Self
    }

    async fn get_page(&self, query: &str) -> Result<String, reqwest::Error> {
        HTTP_CLIENT
            .get(ENDPOINT)
            .query(&[("q", query)])
            .timeout(DISCOVERY_TIMEOUT)
            .header(header::USER_AGENT, DISCOVERY_USER_AGENT)
            .header(header::ACCEPT, "text/html")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn post_next(&self, fields: &[(String, String)]) -> Result<String, reqwest::Error> {
        HTTP_CLIENT
            .post(ENDPOINT)
            .form(fields)
            .timeout(DISCOVERY_TIMEOUT)
            .header(header::USER_AGENT, DISCOVERY_USER_AGENT)
            .header(header::ACCEPT, "text/html")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl DiscoverySource for DuckDuckGoDiscovery {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Vec<DiscoveryHit> {
        let mut hits: Vec<DiscoveryHit> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("discovery cancelled during page 1");
                return hits;
            }
            outcome = self.get_page(query) => outcome,
        };
        let html = match outcome {
            Ok(html) => html,
            Err(e) => {
                debug!("discovery page 1 failed: {}", e);
                return hits;
            }
        };
        let parsed = parse_results(&html);
        collect(&mut hits, &mut seen, parsed.hits, max_results);

        if hits.len() >= max_results {
            return hits;
        }
        let Some(next_form) = parsed.next_form else {
            return hits;
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("discovery cancelled during page 2");
                return hits;
            }
            outcome = self.post_next(&next_form) => outcome,
        };
        match outcome {
            Ok(html) => {
                let parsed = parse_results(&html);
                collect(&mut hits, &mut seen, parsed.hits, max_results);
            }
            Err(e) => debug!("discovery page 2 failed: {}", e),
        }
        hits
    }
}

fn collect(
    hits: &mut Vec<DiscoveryHit>,
    seen: &mut HashSet<String>,
    new_hits: Vec<DiscoveryHit>,
    max_results: usize,
) {
    for hit in new_hits {
        if hits.len() >= max_results {
            return;
        }
        if seen.insert(hit.url.clone()) {
            hits.push(hit);
        }
    }
}

/// What one page of engine markup yields.
pub(crate) struct ParsedResults {
    pub hits: Vec<DiscoveryHit>,
    /// Hidden fields of the "Next" form, when pagination can continue
    pub next_form: Option<Vec<(String, String)>>,
}

/// Substring check on an element's `class` attribute, since the
/// endpoint's class names carry version suffixes that change without
/// notice.
fn class_contains(el: &ElementRef<'_>, needle: &str) -> bool {
    el.value().attr("class").is_some_and(|c| c.contains(needle))
}

/// Extracts result tuples and the pagination form from one page of
/// markup.
pub(crate) fn parse_results(html: &str) -> ParsedResults {
    let document = Html::parse_document(html);

    let mut nodes: Vec<ElementRef<'_>> = document
        .select(&DIV_SELECTOR)
        .filter(|el| class_contains(el, "result__body"))
        .collect();
    if nodes.is_empty() {
        nodes = document
            .select(&DIV_SELECTOR)
            .filter(|el| class_contains(el, "result"))
            .collect();
    }

    let mut hits = Vec::new();
    for node in nodes {
        let anchor = node
            .select(&ANCHOR_SELECTOR)
            .find(|a| class_contains(a, "result__a"))
            .or_else(|| node.select(&ANCHOR_SELECTOR).next());
        let Some(anchor) = anchor else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_destination(href) else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();
        let snippet = node
            .select(&ANCHOR_SELECTOR)
            .find(|el| class_contains(el, "result__snippet"))
            .map(|el| el.text().collect::<String>())
            .or_else(|| {
                node.select(&DIV_SELECTOR)
                    .find(|el| class_contains(el, "result__snippet"))
                    .map(|el| el.text().collect::<String>())
            })
            .unwrap_or_default()
            .trim()
            .to_string();
        hits.push(DiscoveryHit { url, title, snippet });
    }

    ParsedResults {
        hits,
        next_form: find_next_form(&document),
    }
}

/// Recovers the destination URL from a result anchor href.
///
/// The engine links through `/l/?uddg=<escaped destination>`; hrefs may
/// also be scheme-relative or, rarely, direct. Only http(s) destinations
/// are accepted.
pub(crate) fn resolve_destination(href: &str) -> Option<String> {
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("https://html.duckduckgo.com{}", href)
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;

    if let Some((_, destination)) = url.query_pairs().find(|(k, _)| k == "uddg") {
        let destination = destination.into_owned();
        let parsed = Url::parse(&destination).ok()?;
        if parsed.scheme() == "http" || parsed.scheme() == "https" {
            return Some(destination);
        }
        return None;
    }

    if (url.scheme() == "http" || url.scheme() == "https")
        && url.host_str() != Some("html.duckduckgo.com")
        && url.host_str() != Some("duckduckgo.com")
    {
        return Some(absolute);
    }
    None
}

/// Finds the form whose submit button is labelled "Next" and returns its
/// hidden inputs in document order.
fn find_next_form(document: &Html) -> Option<Vec<(String, String)>> {
    for form in document.select(&FORM_SELECTOR) {
        let is_next = form.select(&INPUT_SELECTOR).any(|input| {
            input.value().attr("type") == Some("submit")
                && input
                    .value()
                    .attr("value")
                    .is_some_and(|v| v.contains("Next"))
        });
        if !is_next {
            continue;
        }
        let fields: Vec<(String, String)> = form
            .select(&INPUT_SELECTOR)
            .filter(|input| input.value().attr("type") == Some("hidden"))
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or("");
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        if !fields.is_empty() {
            return Some(fields);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r##"<html><body>
      <div class="results">
        <div class="result results_links results_links_deep web-result">
          <div class="links_main links_deep result__body">
            <h2 class="result__title">
              <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fplato.stanford.edu%2Fentries%2Faquinas%2F&amp;rut=abc">Aquinas (Stanford Encyclopedia)</a>
            </h2>
            <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fplato.stanford.edu%2Fentries%2Faquinas%2F">Thomas Aquinas on natural law &amp; virtue.</a>
          </div>
        </div>
        <div class="result web-result">
          <div class="links_main result__body">
            <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fessay&amp;rut=def">An essay</a></h2>
            <a class="result__snippet" href="#">Some snippet text.</a>
          </div>
        </div>
      </div>
      <form action="/html/" method="post">
        <input type="hidden" name="q" value="aquinas" />
        <input type="hidden" name="s" value="30" />
        <input type="hidden" name="nextParams" value="" />
        <input type="hidden" name="v" value="l" />
        <input type="submit" class="btn" value="Next" />
      </form>
    </body></html>"##;

    #[test]
    fn test_parse_results_extracts_tuples() {
        let parsed = parse_results(RESULT_PAGE);
        assert_eq!(parsed.hits.len(), 2);
        assert_eq!(
            parsed.hits[0].url,
            "https://plato.stanford.edu/entries/aquinas/"
        );
        assert_eq!(parsed.hits[0].title, "Aquinas (Stanford Encyclopedia)");
        assert_eq!(
            parsed.hits[0].snippet,
            "Thomas Aquinas on natural law & virtue."
        );
        assert_eq!(parsed.hits[1].url, "https://example.com/essay");
    }

    #[test]
    fn test_parse_results_finds_next_form_fields() {
        let parsed = parse_results(RESULT_PAGE);
        let fields = parsed.next_form.expect("next form");
        assert!(fields.contains(&("q".to_string(), "aquinas".to_string())));
        assert!(fields.contains(&("s".to_string(), "30".to_string())));
        // The submit button itself is not a field.
        assert!(fields.iter().all(|(name, _)| name != "btn"));
    }

    #[test]
    fn test_parse_results_without_next_form() {
        let parsed = parse_results("<html><body><div class='result__body'><a href='https://example.org/x'>t</a></div></body></html>");
        assert!(parsed.next_form.is_none());
        assert_eq!(parsed.hits.len(), 1);
    }

    #[test]
    fn test_resolve_destination_unescapes_uddg() {
        let url = resolve_destination(
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fjstor.org%2Fstable%2F123%3Fseq%3D2&rut=x",
        )
        .unwrap();
        assert_eq!(url, "https://jstor.org/stable/123?seq=2");
    }

    #[test]
    fn test_resolve_destination_rejects_non_http() {
        assert!(resolve_destination("//duckduckgo.com/l/?uddg=javascript%3Aalert(1)").is_none());
        assert!(resolve_destination("//duckduckgo.com/l/?uddg=ftp%3A%2F%2Fx%2Fy").is_none());
    }

    #[test]
    fn test_resolve_destination_direct_link() {
        assert_eq!(
            resolve_destination("https://example.com/page").as_deref(),
            Some("https://example.com/page")
        );
        assert!(resolve_destination("/html/?q=more").is_none());
    }

    #[test]
    fn test_malformed_page_yields_nothing() {
        let parsed = parse_results("<<<not html at all");
        assert!(parsed.hits.is_empty());
        assert!(parsed.next_form.is_none());
    }
}
