//! robots.txt gate for the fetch client.
//!
//! One policy is fetched and cached per host. A probe that fails or times
//! out (3 s) degrades to allow-all, never to a blocked pipeline.
//! Directive resolution is longest-match-wins with `Allow` winning
//! length ties; patterns support `*` globs and a terminal `$` anchor.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::ROBOTS_TIMEOUT;
use crate::live::fetcher::HTTP_CLIENT;

/// Per-host robots.txt checker.
pub struct RobotsChecker {
    agent: String,
    cache: DashMap<String, Arc<RobotsPolicy>>,
}

impl RobotsChecker {
    /// `agent` is the user-agent token matched against robots sections.
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            cache: DashMap::new(),
        }
    }

    /// Whether fetching `url` is permitted. Unknown hosts trigger one
    /// probe; the verdict is cached for the checker's lifetime.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return true;
        };
        let policy = match self.cache.get(host) {
            Some(policy) => policy.clone(),
            None => {
                let policy = Arc::new(self.probe(url.scheme(), host).await);
                self.cache.insert(host.to_string(), policy.clone());
                policy
            }
        };
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        policy.is_allowed(&path)
    }

    async fn probe(&self, scheme: &str, host: &str) -> RobotsPolicy {
        let robots_url = format!("{}://{}/robots.txt", scheme, host);
        let response = HTTP_CLIENT
            .get(&robots_url)
            .timeout(ROBOTS_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => parse_robots(&body, &self.agent),
                Err(e) => {
                    debug!("robots body read failed for {}: {}", host, e);
                    RobotsPolicy::allow_all()
                }
            },
            Ok(_) | Err(_) => RobotsPolicy::allow_all(),
        }
    }
}

/// The rules applicable to one user agent on one host.
#[derive(Debug, Default)]
pub(crate) struct RobotsPolicy {
    rules: Vec<RobotsRule>,
}

#[derive(Debug, Clone)]
struct RobotsRule {
    allow: bool,
    pattern: String,
}

impl RobotsPolicy {
    fn allow_all() -> Self {
        Self::default()
    }

    /// Longest matching pattern decides; `Allow` wins an exact length
    /// tie; no match means allowed.
    pub(crate) fn is_allowed(&self, path: &str) -> bool {
        let mut verdict = true;
        let mut best_len = 0usize;
        let mut have_match = false;
        for rule in &self.rules {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            let len = rule.pattern.len();
            let wins = !have_match
                || len > best_len
                || (len == best_len && rule.allow && !verdict);
            if wins {
                verdict = rule.allow;
                best_len = len;
                have_match = true;
            }
        }
        verdict
    }
}

/// Parses a robots.txt body, keeping the rules of the sections addressed
/// to `agent` (substring match, case-insensitive), or of the `*` sections
/// when no specific section matches.
pub(crate) fn parse_robots(body: &str, agent: &str) -> RobotsPolicy {
    let agent_lower = agent.to_lowercase();

    struct Section {
        agents: Vec<String>,
        rules: Vec<RobotsRule>,
    }
    let mut sections: Vec<Section> = Vec::new();
    let mut in_agent_run = false;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_lowercase();
        let value = value.trim();
        match field.as_str() {
            "user-agent" => {
                if !in_agent_run {
                    sections.push(Section {
                        agents: Vec::new(),
                        rules: Vec::new(),
                    });
                    in_agent_run = true;
                }
                if let Some(section) = sections.last_mut() {
                    section.agents.push(value.to_lowercase());
                }
            }
            "allow" | "disallow" => {
                in_agent_run = false;
                // An empty Disallow means "allow everything"; it adds no rule.
                if value.is_empty() {
                    continue;
                }
                if let Some(section) = sections.last_mut() {
                    section.rules.push(RobotsRule {
                        allow: field == "allow",
                        pattern: value.to_string(),
                    });
                }
            }
            _ => {
                in_agent_run = false;
            }
        }
    }

    let matched: Vec<&Section> = sections
        .iter()
        .filter(|s| {
            s.agents
                .iter()
                .any(|a| a != "*" && agent_lower.contains(a.as_str()))
        })
        .collect();
    if !matched.is_empty() {
        return RobotsPolicy {
            rules: matched
                .iter()
                .flat_map(|s| s.rules.iter().cloned())
                .collect(),
        };
    }

    let wildcard: Vec<RobotsRule> = sections
        .iter()
        .filter(|s| s.agents.iter().any(|a| a == "*"))
        .flat_map(|s| s.rules.iter().cloned())
        .collect();
    RobotsPolicy { rules: wildcard }
}

/// Robots pattern match: implicit path-prefix semantics with `*` globs
/// and an optional terminal `$` anchor.
pub(crate) fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };
    let parts: Vec<&str> = pattern.split('*').collect();

    let mut pos = 0usize;
    for (i, part) in parts.iter().enumerate() {
        let last = i == parts.len() - 1;
        if i == 0 {
            if !path[pos..].starts_with(part) {
                return false;
            }
            pos += part.len();
        } else if last && anchored {
            return path[pos..].ends_with(part);
        } else {
            match path[pos..].find(part) {
                Some(idx) => pos = pos + idx + part.len(),
                None => return false,
            }
        }
    }
    if anchored {
        return pos == path.len();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\
User-agent: *\n\
Disallow: /private/\n\
Allow: /private/public/\n\
Disallow: /tmp\n\
\n\
User-agent: lectio\n\
Disallow: /no-bots/\n";

    #[test]
    fn test_specific_section_preferred() {
        let policy = parse_robots(BODY, "lectio/0.1 (scholarly meta-search)");
        assert!(!policy.is_allowed("/no-bots/page"));
        // The wildcard section does not apply once a specific one matched.
        assert!(policy.is_allowed("/private/page"));
    }

    #[test]
    fn test_wildcard_fallback() {
        let policy = parse_robots(BODY, "someotherbot/2.0");
        assert!(!policy.is_allowed("/private/page"));
        assert!(policy.is_allowed("/open/page"));
    }

    #[test]
    fn test_longest_match_wins() {
        let policy = parse_robots(BODY, "someotherbot/2.0");
        // /private/public/ (Allow, longer) beats /private/ (Disallow).
        assert!(policy.is_allowed("/private/public/doc"));
    }

    #[test]
    fn test_allow_wins_length_tie() {
        let body = "User-agent: *\nDisallow: /a/b/\nAllow: /a/c/\nDisallow: /x/y/\nAllow: /x/y/\n";
        let policy = parse_robots(body, "anybot");
        assert!(policy.is_allowed("/x/y/page"));
        assert!(!policy.is_allowed("/a/b/page"));
    }

    #[test]
    fn test_glob_and_anchor_patterns() {
        assert!(pattern_matches("/search*", "/search/results"));
        assert!(pattern_matches("/*.pdf$", "/papers/natural-law.pdf"));
        assert!(!pattern_matches("/*.pdf$", "/papers/natural-law.pdf?download=1"));
        assert!(pattern_matches("/a/*/c", "/a/b/c/d"));
        assert!(!pattern_matches("/a/*/c", "/a/b/d"));
        assert!(pattern_matches("/exact$", "/exact"));
        assert!(!pattern_matches("/exact$", "/exactly"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let policy = parse_robots("User-agent: *\nDisallow:\n", "anybot");
        assert!(policy.is_allowed("/anything"));
    }

    #[test]
    fn test_no_rules_allows_everything() {
        let policy = parse_robots("", "anybot");
        assert!(policy.is_allowed("/anything"));
    }
}
