//! HTML content extraction: one parse yielding title, visible text, and
//! outbound links.
//!
//! Uses the scraper crate. Chrome (script/style/svg) and furniture
//! (nav/header/footer) subtrees are skipped entirely; block-level elements
//! contribute a separating space so adjacent paragraphs do not fuse into
//! one token.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractError;

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid selector"));
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Elements whose entire subtree is invisible or navigational furniture.
const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "svg", "path", "iframe", "nav", "footer", "header",
];

/// Block-level elements that terminate a run of inline text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "blockquote", "section",
    "article",
];

/// What one parse of a page yields.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// `<title>` content, or the first `<h1>`, or empty
    pub title: String,
    /// Visible text with whitespace runs collapsed
    pub text: String,
    /// Absolute http(s) links with fragments dropped
    pub links: Vec<String>,
}

/// Parses `html` and extracts `(title, text, links)`.
///
/// `base_url` anchors relative hrefs; an unparseable base is the only
/// error case.
pub fn extract(html: &str, base_url: &str) -> Result<ExtractedPage, ExtractError> {
    let base = Url::parse(base_url)
        .map_err(|e| ExtractError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
    let document = Html::parse_document(html);

    Ok(ExtractedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, &base),
    })
}

fn extract_title(document: &Html) -> String {
    if let Some(el) = document.select(&TITLE_SELECTOR).next() {
        let title = el.text().collect::<String>().trim().to_string();
        if !title.is_empty() {
            return title;
        }
    }
    document
        .select(&H1_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn extract_text(document: &Html) -> String {
    let mut raw = String::new();
    if let Some(body) = document.select(&BODY_SELECTOR).next() {
        collect_text(body, &mut raw);
    }
    // Collapse whitespace runs into single spaces.
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    use scraper::node::Node;

    let name = element.value().name();
    if SKIP_ELEMENTS.contains(&name) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
    if BLOCK_ELEMENTS.contains(&name) {
        out.push(' ');
    }
}

fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        let Ok(mut absolute) = base.join(href) else {
            continue;
        };
        if absolute.scheme() != "http" && absolute.scheme() != "https" {
            continue;
        }
        absolute.set_fragment(None);
        let link = absolute.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}
