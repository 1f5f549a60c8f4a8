//! Fixture-backed chat model for running without an API key

use serde_json::json;
use tracing::info;

use super::{ChatModel, Completion, CompletionOutcome, CompletionRequest, Intent, Role, TokenUsage};
use crate::brochure::{TRANSLATION_MARKER, offline};
use crate::compiler::ConsolidatedContent;
use crate::error::Result;

/// Model name reported by offline completions
pub const OFFLINE_MODEL: &str = "offline";

/// Answers every request from fixture content, without network access
#[derive(Debug, Clone)]
pub struct OfflineChatModel {
    content: ConsolidatedContent,
}

impl OfflineChatModel {
    pub fn new(content: ConsolidatedContent) -> Self {
        info!("*** OFFLINE MODE (no API key) ***");
        Self { content }
    }

    pub fn content(&self) -> &ConsolidatedContent {
        &self.content
    }

    /// One link per fixture category, pointing at the page it came from
    fn link_selection(&self) -> String {
        let links: Vec<_> = self
            .content
            .iter()
            .enumerate()
            .filter_map(|(i, (category, text))| {
                let url = offline::source_url(text)?;
                Some(json!({
                    "type": category,
                    "url": url,
                    "score": 100usize.saturating_sub(i * 5),
                    "rationale": "Offline fixture content",
                }))
            })
            .collect();
        json!({ "links": links }).to_string()
    }

    fn translation(request: &CompletionRequest, language: &str) -> String {
        let user = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .unwrap_or("");
        let original = user
            .split_once(TRANSLATION_MARKER)
            .map(|(_, brochure)| brochure.trim())
            .unwrap_or(user);
        format!(
            "{}\n\n[SIMULATED TRANSLATION TO {}]",
            original,
            language.to_uppercase()
        )
    }
}

impl ChatModel for OfflineChatModel {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        let text = match &request.intent {
            Intent::LinkSelection => self.link_selection(),
            Intent::Brochure { company, tone } => {
                info!("Rendering offline {} brochure", tone);
                offline::render(*tone, company, &self.content)
            }
            Intent::Translation { language } => {
                info!("Offline mode: skipping real translation");
                Self::translation(&request, language)
            }
        };

        Ok(CompletionOutcome::Completed(Completion {
            text,
            model: OFFLINE_MODEL.to_string(),
            usage: TokenUsage::default(),
        }))
    }
}
