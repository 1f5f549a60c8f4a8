//! Conversation building for link selection

use schemars::schema_for;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::SelectedLinksResult;
use crate::model::{ChatMessage, Role};

const SYSTEM_TEMPLATE: &str = include_str!("../../prompts/link_system.md");
const FEW_SHOTS: &str = include_str!("../../prompts/link_few_shots.json");

/// Sent after a reply that could not be parsed into links
pub const CORRECTION_MESSAGE: &str = r#"ERROR: your previous answer does not have the correct JSON format.

IMPORTANT: respond ONLY with a valid JSON object with exactly this structure:
{
  "links": [
    {"type": "about page", "url": "https://example.com/about", "score": 90, "rationale": "Company overview."},
    {"type": "careers page", "url": "https://example.com/careers", "score": 80, "rationale": "Open roles."}
  ]
}

Do NOT include extra text, explanations or Markdown code blocks.
Try again with the correct format."#;

#[derive(Debug, Deserialize)]
struct FewShot {
    role: Role,
    content: Value,
}

/// System prompt with the result schema filled in
pub fn system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&schema_for!(SelectedLinksResult))
        .unwrap_or_else(|_| "{}".to_string());
    SYSTEM_TEMPLATE.replace("{schema}", &schema)
}

/// Example exchanges. Assistant answers are sent as JSON text, not objects.
pub fn few_shot_messages() -> Vec<ChatMessage> {
    let shots: Vec<FewShot> = match serde_json::from_str(FEW_SHOTS) {
        Ok(shots) => shots,
        Err(e) => {
            warn!("Error loading few-shot examples: {}", e);
            return Vec::new();
        }
    };

    shots
        .into_iter()
        .map(|shot| {
            let content = match shot.content {
                Value::String(text) => text,
                other => other.to_string(),
            };
            ChatMessage {
                role: shot.role,
                content,
            }
        })
        .collect()
}

/// The request listing every candidate link
pub fn user_message(base_url: &str, links: &[String]) -> String {
    let listing = links
        .iter()
        .map(|link| format!("- {}", link))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Base website: {}\nLinks found ({} total):\n{}\nSelect the most relevant links and return the JSON.",
        base_url,
        links.len(),
        listing
    )
}

/// System prompt, few-shot examples and the user request, in order
pub fn conversation(base_url: &str, links: &[String]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt())];
    messages.extend(few_shot_messages());
    messages.push(ChatMessage::user(user_message(base_url, links)));
    messages
}
