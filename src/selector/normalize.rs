//! Link normalization: resolve, filter and deduplicate raw hrefs

use std::collections::HashSet;

use tracing::{debug, warn};
use url::Url;

/// Most links handed to the model in one request
pub const MAX_LINK_CANDIDATES: usize = 200;

fn is_skipped(link: &str) -> bool {
    let lower = link.trim_start().to_ascii_lowercase();
    lower.starts_with('#') || lower.starts_with("javascript:")
}

fn is_absolute_http(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve one href against the base. `None` means the link is dropped.
fn normalize_one(base: Option<&Url>, raw: &str) -> Option<String> {
    let link = raw.trim();

    if is_skipped(link) {
        debug!("Skipping anchor or script link '{}'", raw);
        return None;
    }

    let resolved = if is_absolute_http(link) {
        link.to_string()
    } else {
        let Some(base) = base else {
            warn!("Cannot resolve '{}' without a valid base URL", raw);
            return None;
        };
        match base.join(link) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Error normalizing link '{}': {}", raw, e);
                return None;
            }
        }
    };

    if is_skipped(&resolved) {
        return None;
    }
    Some(resolved)
}

/// Resolve raw hrefs against `base_url`, drop fragments and script links,
/// and deduplicate keeping first-seen order.
pub fn normalize_links<I, S>(base_url: &str, links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let base = match Url::parse(base_url) {
        Ok(base) => Some(base),
        Err(e) => {
            warn!("Invalid base URL '{}': {}", base_url, e);
            None
        }
    };

    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for raw in links {
        if let Some(link) = normalize_one(base.as_ref(), raw.as_ref()) {
            if seen.insert(link.clone()) {
                unique.push(link);
            }
        }
    }
    unique
}

/// Keep the first `max` links, warning when some are dropped.
pub fn cap_links(mut links: Vec<String>, max: usize) -> Vec<String> {
    if links.len() > max {
        warn!(
            "Limiting {} links to {} to stay within the model context",
            links.len(),
            max
        );
        links.truncate(max);
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acme_scenario() {
        let raw = [
            "/about",
            "#top",
            "javascript:void(0)",
            "https://acme.test/careers",
            "/about",
        ];

        let normalized = normalize_links("https://acme.test", raw);

        assert_eq!(
            normalized,
            vec!["https://acme.test/about", "https://acme.test/careers"]
        );
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        let normalized = normalize_links(
            "https://acme.test/company/",
            ["team", "../blog", "//cdn.acme.test/x", "?page=2"],
        );

        assert_eq!(
            normalized,
            vec![
                "https://acme.test/company/team",
                "https://acme.test/blog",
                "https://cdn.acme.test/x",
                "https://acme.test/company/?page=2",
            ]
        );
    }

    #[test]
    fn test_absolute_links_pass_through_unchanged() {
        let normalized = normalize_links("https://acme.test", ["HTTPS://Other.test/Path"]);
        assert_eq!(normalized, vec!["HTTPS://Other.test/Path"]);
    }

    #[test]
    fn test_script_links_are_dropped_case_insensitively() {
        let normalized = normalize_links(
            "https://acme.test",
            ["JavaScript:alert(1)", "  #section", "/ok"],
        );
        assert_eq!(normalized, vec!["https://acme.test/ok"]);
    }

    #[test]
    fn test_invalid_base_keeps_absolute_links() {
        let normalized = normalize_links("not a url", ["/about", "https://acme.test/jobs"]);
        assert_eq!(normalized, vec!["https://acme.test/jobs"]);
    }

    #[test]
    fn test_cap_keeps_first_links_in_order() {
        let links: Vec<String> = (0..250).map(|i| format!("https://acme.test/p{}", i)).collect();

        let capped = cap_links(links.clone(), MAX_LINK_CANDIDATES);

        assert_eq!(capped.len(), 200);
        assert_eq!(capped[..], links[..200]);
    }
}
