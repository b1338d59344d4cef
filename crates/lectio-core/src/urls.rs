//! URL canonicalization and the scholarly-domain classifier.
//!
//! Canonical form is what the live pipeline dedupes and keys documents by:
//! lowercased, `https` forced, leading `www.` stripped, trailing slash and
//! fragment dropped, path and query preserved.

use url::Url;

/// Hosts that receive the scholarly ranking boost. Matched exactly or as a
/// `.domain` suffix.
pub const SCHOLARLY_DOMAINS: &[&str] = &[
    "plato.stanford.edu",
    "iep.utm.edu",
    "jstor.org",
    "academia.edu",
    "philpapers.org",
    "scholar.google.com",
    "arxiv.org",
    "doi.org",
    "newadvent.org",
    "corpusthomisticum.org",
    "dhspriory.org",
    "aquinas.cc",
    "ccel.org",
    "fordham.edu",
    "orthodoxwiki.org",
    "carm.org",
    "monergism.com",
    "theopedia.com",
    "britannica.com",
    "en.wikipedia.org",
];

/// Reduces a URL to its canonical deduplication form.
///
/// Returns `None` when the input does not parse as an http(s) URL.
///
/// # Example
///
/// ```
/// use lectio_core::urls::canonicalize;
///
/// let canon = canonicalize("http://www.JSTOR.org/stable/123/#page2").unwrap();
/// assert_eq!(canon, "https://jstor.org/stable/123");
/// ```
pub fn canonicalize(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = url.path().trim_end_matches('/');
    let mut canon = match url.port() {
        Some(port) => format!("https://{}:{}{}", host, port, path),
        None => format!("https://{}{}", host, path),
    };
    if let Some(query) = url.query() {
        canon.push('?');
        canon.push_str(query);
    }
    Some(canon.to_lowercase())
}

/// Host of a URL with any leading `www.` stripped, lowercased.
pub fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(
        host.strip_prefix("www.")
            .unwrap_or(host)
            .to_lowercase(),
    )
}

/// Whether `host` is in the scholarly set, exactly or as a subdomain.
pub fn is_scholarly_host(host: &str) -> bool {
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    SCHOLARLY_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

/// Whether a URL's host is in the scholarly set.
pub fn is_scholarly_url(raw: &str) -> bool {
    host_of(raw).is_some_and(|h| is_scholarly_host(&h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_forces_https_and_strips_www() {
        assert_eq!(
            canonicalize("http://www.jstor.org/x").unwrap(),
            "https://jstor.org/x"
        );
    }

    #[test]
    fn test_canonicalize_drops_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize("https://jstor.org/x/#frag").unwrap(),
            "https://jstor.org/x"
        );
    }

    #[test]
    fn test_canonicalize_preserves_query() {
        assert_eq!(
            canonicalize("https://example.com/a?b=C&d=e").unwrap(),
            "https://example.com/a?b=c&d=e"
        );
    }

    #[test]
    fn test_canonicalize_equates_common_variants() {
        let a = canonicalize("https://www.jstor.org/x/").unwrap();
        let b = canonicalize("http://jstor.org/x").unwrap();
        let c = canonicalize("https://jstor.org/x#frag").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_canonicalize_rejects_non_http() {
        assert!(canonicalize("ftp://example.com/x").is_none());
        assert!(canonicalize("not a url").is_none());
    }

    #[test]
    fn test_scholarly_exact_and_suffix() {
        assert!(is_scholarly_host("jstor.org"));
        assert!(is_scholarly_host("daily.jstor.org"));
        assert!(is_scholarly_host("www.jstor.org"));
        assert!(!is_scholarly_host("notjstor.org"));
        assert!(!is_scholarly_host("example.com"));
    }

    #[test]
    fn test_scholarly_url() {
        assert!(is_scholarly_url("https://plato.stanford.edu/entries/aquinas/"));
        assert!(!is_scholarly_url("https://example.com/aquinas"));
    }
}
