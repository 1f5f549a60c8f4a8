//! # Link Selector
//!
//! Turns the raw hrefs of a landing page into a short list of categorized
//! links worth scraping. Links are normalized and capped, then a language
//! model is asked for a JSON decision. Replies that do not parse or validate
//! are answered with a correction message and retried a bounded number of
//! times; a run that never gets a usable reply yields an empty result.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::markdown::{strip_code_fences, truncate_chars};
use crate::model::{ChatMessage, ChatModel, CompletionOutcome, CompletionRequest, Intent};
use crate::validate::validate_selected_links;

pub mod normalize;
pub mod prompt;

pub use normalize::{MAX_LINK_CANDIDATES, cap_links, normalize_links};

/// A link the model judged relevant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectedLink {
    /// Free-text category, such as "about page" or "careers page"
    #[serde(rename = "type")]
    pub kind: String,

    /// Absolute URL of the page
    pub url: String,

    /// Relevance from 0 to 100
    #[schemars(range(min = 0, max = 100))]
    pub score: u8,

    /// Why the page is useful for the brochure
    pub rationale: String,
}

/// The selector's answer; empty when selection failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectedLinksResult {
    #[serde(default)]
    pub links: Vec<SelectedLink>,
}

impl SelectedLinksResult {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Asks a chat model which links matter
pub struct LinkSelector<M: ChatModel> {
    model: M,
    model_name: String,
    max_tokens: u32,
    temperature: f32,
    max_attempts: u32,
}

impl<M: ChatModel> LinkSelector<M> {
    pub fn new(model: M, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            max_tokens: 2000,
            temperature: 0.3,
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Pick the relevant links among `raw_links` found on `base_url`.
    ///
    /// Only fatal model errors are returned as `Err`. An exhausted backend or
    /// a model that never produces valid JSON yields an empty result.
    #[instrument(skip(self, raw_links))]
    pub async fn select<I, S>(&self, base_url: &str, raw_links: I) -> Result<SelectedLinksResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = cap_links(normalize_links(base_url, raw_links), MAX_LINK_CANDIDATES);
        let mut messages = prompt::conversation(base_url, &candidates);

        info!(
            "Analyzing {} links with {}...",
            candidates.len(),
            self.model_name
        );

        for attempt in 1..=self.max_attempts {
            let request = CompletionRequest {
                messages: messages.clone(),
                model: self.model_name.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                intent: Intent::LinkSelection,
            };

            let completion = match self.model.complete(request).await? {
                CompletionOutcome::Completed(completion) => completion,
                CompletionOutcome::Unrecoverable { reason } => {
                    error!("Model gave up during link selection: {}", reason);
                    return Ok(SelectedLinksResult::default());
                }
            };

            let reply = completion.text.trim().to_string();
            info!(
                "Reply received (attempt {}/{}). Tokens used: {}",
                attempt, self.max_attempts, completion.usage.total
            );

            let cleaned = strip_code_fences(&reply, "json");
            let failure = match serde_json::from_str::<Value>(&cleaned) {
                Ok(value) => {
                    let validated = validate_selected_links(&value);
                    if !validated.is_empty() {
                        info!("Selected links: {}", validated.links.len());
                        return Ok(validated);
                    }
                    "validation returned no links".to_string()
                }
                Err(e) => format!("invalid JSON: {}", e),
            };

            warn!(
                "Attempt {}/{} failed: {}",
                attempt, self.max_attempts, failure
            );

            if attempt < self.max_attempts {
                messages.push(ChatMessage::assistant(reply));
                messages.push(ChatMessage::user(prompt::CORRECTION_MESSAGE));
                info!("Retrying with stricter format instructions...");
            } else {
                error!(
                    "All attempts failed. Last reply:\n{}",
                    truncate_chars(&reply, 500)
                );
            }
        }

        Ok(SelectedLinksResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::Role;
    use crate::model::mock_model::{ScriptedChatModel, ScriptedReply};

    const VALID_REPLY: &str = r#"{"links": [
        {"type": "about page", "url": "https://acme.test/about", "score": 92, "rationale": "Company story."},
        {"type": "careers page", "url": "https://acme.test/careers", "score": 80, "rationale": "Jobs."}
    ]}"#;

    fn raw_links() -> Vec<&'static str> {
        vec![
            "/about",
            "#top",
            "javascript:void(0)",
            "https://acme.test/careers",
            "/about",
        ]
    }

    #[tokio::test]
    async fn test_valid_reply_returns_on_first_attempt() {
        let model = ScriptedChatModel::new(vec![ScriptedReply::Text(format!(
            "```json\n{}\n```",
            VALID_REPLY
        ))]);
        let selector = LinkSelector::new(&model, "gpt-4o-mini");

        let result = selector.select("https://acme.test", raw_links()).await.unwrap();

        assert_eq!(result.links.len(), 2);
        assert_eq!(result.links[0].kind, "about page");

        let requests = model.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].max_tokens, 2000);
        let user = &requests[0].messages.last().unwrap().content;
        assert!(user.contains("- https://acme.test/about\n- https://acme.test/careers"));
        assert!(!user.contains("#top"));
    }

    #[tokio::test]
    async fn test_malformed_replies_stop_after_three_attempts() {
        let model = ScriptedChatModel::always("Sure! Here are the links you asked for.");
        let selector = LinkSelector::new(&model, "gpt-4o-mini");

        let result = selector.select("https://acme.test", raw_links()).await.unwrap();

        assert!(result.is_empty());
        let requests = model.requests().await;
        assert_eq!(requests.len(), 3);

        // Each retry carries the previous reply and a correction
        let last = &requests[2].messages;
        let tail: Vec<Role> = last.iter().rev().take(4).map(|m| m.role).collect();
        assert_eq!(
            tail,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(last.last().unwrap().content, prompt::CORRECTION_MESSAGE);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_bad_reply() {
        let model = ScriptedChatModel::new(vec![
            ScriptedReply::Text("not json".to_string()),
            ScriptedReply::Text(r#"{"links": []}"#.to_string()),
            ScriptedReply::Text(r#"{"links": [{"type": "about page", "url": "https://acme.test/about"}]}"#.to_string()),
        ]);
        let selector = LinkSelector::new(&model, "gpt-4o-mini");

        let result = selector.select("https://acme.test", raw_links()).await.unwrap();

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].score, 0);
        assert_eq!(result.links[0].rationale, "missing");
        assert_eq!(model.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unrecoverable_stops_immediately() {
        let model = ScriptedChatModel::new(vec![
            ScriptedReply::Unrecoverable("quota exhausted".to_string()),
            ScriptedReply::Text(VALID_REPLY.to_string()),
        ]);
        let selector = LinkSelector::new(&model, "gpt-4o-mini");

        let result = selector.select("https://acme.test", raw_links()).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(model.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let model = ScriptedChatModel::new(vec![ScriptedReply::AuthFailure]);
        let selector = LinkSelector::new(&model, "gpt-4o-mini");

        let result = selector.select("https://acme.test", raw_links()).await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_candidates_are_capped() {
        let model = ScriptedChatModel::always(VALID_REPLY);
        let selector = LinkSelector::new(&model, "gpt-4o-mini");
        let links: Vec<String> = (0..250).map(|i| format!("/page-{}", i)).collect();

        selector.select("https://acme.test", &links).await.unwrap();

        let requests = model.requests().await;
        let user = &requests[0].messages.last().unwrap().content;
        assert!(user.contains("Links found (200 total)"));
        assert!(user.contains("/page-199"));
        assert!(!user.contains("/page-200"));
    }
}
