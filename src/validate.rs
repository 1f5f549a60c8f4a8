//! Structural validation of model replies and compiled content.
//!
//! Selected links go through two tiers. `parse_strict` accepts only replies
//! where every entry carries all four fields with valid values.
//! `recover_lenient` salvages entries that at least name a `type` and a
//! `url`, filling in a zero score and a `"missing"` rationale where needed.

use serde::de::Error as _;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::compiler::ConsolidatedContent;
use crate::selector::{SelectedLink, SelectedLinksResult};

/// Rationale given to recovered links that had none
pub const MISSING_RATIONALE: &str = "missing";

/// Full-schema parse of a selector reply.
pub fn parse_strict(data: &Value) -> Result<SelectedLinksResult, serde_json::Error> {
    let result: SelectedLinksResult = serde_json::from_value(data.clone())?;
    if let Some(link) = result.links.iter().find(|link| link.score > 100) {
        return Err(serde_json::Error::custom(format!(
            "score {} for {} is outside 0..=100",
            link.score, link.url
        )));
    }
    Ok(result)
}

/// Pull whatever usable links a malformed reply still contains.
pub fn recover_lenient(data: &Value) -> SelectedLinksResult {
    let Some(entries) = data.get("links").and_then(Value::as_array) else {
        return SelectedLinksResult::default();
    };

    let links = entries
        .iter()
        .filter_map(|entry| {
            let kind = entry.get("type")?.as_str()?;
            let url = entry.get("url")?.as_str()?;

            let score = entry
                .get("score")
                .and_then(Value::as_u64)
                .filter(|score| *score <= 100)
                .and_then(|score| u8::try_from(score).ok())
                .unwrap_or(0);
            let rationale = entry
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or(MISSING_RATIONALE);

            Some(SelectedLink {
                kind: kind.to_string(),
                url: url.to_string(),
                score,
                rationale: rationale.to_string(),
            })
        })
        .collect();

    SelectedLinksResult { links }
}

/// Strict validation, falling back to lenient recovery. Never fails.
pub fn validate_selected_links(data: &Value) -> SelectedLinksResult {
    match parse_strict(data) {
        Ok(result) => {
            info!("Selected links validated: {} links", result.links.len());
            result
        }
        Err(e) => {
            error!("Selected links failed validation: {}", e);
            warn!("Trying to recover partial data...");

            let recovered = recover_lenient(data);
            if recovered.links.is_empty() {
                error!("No valid links could be recovered");
            } else {
                info!(
                    "Recovered {} links with default score/rationale where missing",
                    recovered.links.len()
                );
            }
            recovered
        }
    }
}

/// Keep only categories whose value is a non-empty string.
///
/// Non-object input yields an empty map.
pub fn validate_compiled_content(data: &Value) -> ConsolidatedContent {
    let Some(object) = data.as_object() else {
        error!("Compiled content is not an object");
        return ConsolidatedContent::new();
    };

    let mut validated = ConsolidatedContent::new();
    for (category, content) in object {
        match content.as_str() {
            Some(text) if !text.is_empty() => {
                debug!("Validated {}: {} characters", category, text.len());
                validated.insert(category.clone(), text.to_string());
            }
            _ => warn!("Invalid content for {}", category),
        }
    }

    info!("Compiled content validated: {} categories", validated.len());
    validated
}

/// Drop empty categories from already-typed content.
pub fn retain_non_empty(content: ConsolidatedContent) -> ConsolidatedContent {
    content
        .into_iter()
        .filter(|(category, text)| {
            let keep = !text.is_empty();
            if !keep {
                warn!("Invalid content for {}", category);
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_accepts_complete_entries() {
        let data = json!({
            "links": [
                {"type": "about page", "url": "https://x/about", "score": 90, "rationale": "company story"},
                {"type": "careers page", "url": "https://x/jobs", "score": 75, "rationale": "open roles"}
            ]
        });

        let result = parse_strict(&data).unwrap();
        assert_eq!(result.links.len(), 2);
        assert_eq!(result.links[0].kind, "about page");
        assert_eq!(result.links[1].score, 75);
    }

    #[test]
    fn test_strict_rejects_missing_fields_and_bad_scores() {
        assert!(parse_strict(&json!({"links": [{"type": "a", "url": "https://x"}]})).is_err());
        assert!(
            parse_strict(&json!({"links": [
                {"type": "a", "url": "https://x", "score": 101, "rationale": "r"}
            ]}))
            .is_err()
        );
        assert!(
            parse_strict(&json!({"links": [
                {"type": "a", "url": "https://x", "score": -1, "rationale": "r"}
            ]}))
            .is_err()
        );
    }

    #[test]
    fn test_strict_defaults_links_to_empty() {
        let result = parse_strict(&json!({})).unwrap();
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_lenient_needs_type_and_url() {
        let missing_url = json!({"links": [{"type": "about page"}]});
        assert!(recover_lenient(&missing_url).links.is_empty());

        let mixed = json!({"links": [{"type": "a", "url": "https://x"}, {"url": "https://y"}]});
        let recovered = recover_lenient(&mixed);
        assert_eq!(
            recovered.links,
            vec![SelectedLink {
                kind: "a".to_string(),
                url: "https://x".to_string(),
                score: 0,
                rationale: MISSING_RATIONALE.to_string(),
            }]
        );
    }

    #[test]
    fn test_lenient_keeps_valid_score_and_rationale() {
        let data = json!({"links": [
            {"type": "a", "url": "https://x", "score": 80},
            {"type": "b", "url": "https://y", "score": 300, "rationale": "why not"},
            {"type": "c", "url": 42}
        ]});

        let recovered = recover_lenient(&data);
        assert_eq!(recovered.links.len(), 2);
        assert_eq!(recovered.links[0].score, 80);
        assert_eq!(recovered.links[0].rationale, MISSING_RATIONALE);
        assert_eq!(recovered.links[1].score, 0);
        assert_eq!(recovered.links[1].rationale, "why not");
    }

    #[test]
    fn test_validate_falls_back_to_lenient() {
        let data = json!({"links": [
            {"type": "about page"},
            {"url": "https://example.com"},
            {"type": "valid", "url": "https://valid.com"}
        ]});

        let result = validate_selected_links(&data);
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].url, "https://valid.com");

        assert!(validate_selected_links(&json!(["not", "an", "object"])).links.is_empty());
    }

    #[test]
    fn test_compiled_content_drops_invalid_entries() {
        let data = json!({
            "about page": "valid content",
            "empty page": "",
            "invalid page": null,
            "numbers": 12
        });

        let result = validate_compiled_content(&data);
        assert_eq!(result.len(), 1);
        assert_eq!(result["about page"], "valid content");

        assert!(validate_compiled_content(&json!("text")).is_empty());
    }

    #[test]
    fn test_retain_non_empty_preserves_order() {
        let mut content = ConsolidatedContent::new();
        content.insert("z".to_string(), "last".to_string());
        content.insert("empty".to_string(), String::new());
        content.insert("a".to_string(), "first".to_string());

        let kept: Vec<_> = retain_non_empty(content).into_keys().collect();
        assert_eq!(kept, vec!["z", "a"]);
    }
}
