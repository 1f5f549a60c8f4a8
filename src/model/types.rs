//! Request and response types shared by every chat model backend

use serde::{Deserialize, Serialize};

use crate::brochure::Tone;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn of a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// What a completion request is for.
///
/// Live backends only use this to label spans; the offline backend uses it
/// to decide which fixture answer to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    LinkSelection,
    Brochure { company: String, tone: Tone },
    Translation { language: String },
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::LinkSelection => "link_selection",
            Intent::Brochure { .. } => "brochure",
            Intent::Translation { .. } => "translation",
        }
    }
}

/// A full chat completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub intent: Intent,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(rename = "prompt_tokens")]
    pub prompt: u32,
    #[serde(rename = "completion_tokens")]
    pub completion: u32,
    #[serde(rename = "total_tokens")]
    pub total: u32,
}

/// A successful completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Result of a completion call that did not hit a fatal error.
///
/// `Unrecoverable` is the terminal-failure sentinel: the backend retried
/// transient failures (rate limits, dropped connections) and gave up.
/// Callers must check for it before using the text.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(Completion),
    Unrecoverable { reason: String },
}

impl CompletionOutcome {
    pub fn completion(self) -> Option<Completion> {
        match self {
            CompletionOutcome::Completed(completion) => Some(completion),
            CompletionOutcome::Unrecoverable { .. } => None,
        }
    }
}
