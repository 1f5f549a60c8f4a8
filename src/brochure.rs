//! # Brochure Generator
//!
//! Builds the brochure prompt from consolidated page content and asks a
//! chat model for the Markdown document. A second call can translate the
//! finished brochure.

use std::fmt;

use chrono::Local;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::compiler::ConsolidatedContent;
use crate::error::{Error, Result};
use crate::language::language_name;
use crate::markdown::{strip_code_fences, truncate_chars};
use crate::model::{ChatMessage, ChatModel, CompletionOutcome, CompletionRequest, Intent};

pub mod offline;

const BROCHURE_SYSTEM: &str = include_str!("../prompts/brochure_system.md");
const TONE_FORMAL: &str = include_str!("../prompts/tone_formal.md");
const TONE_HUMOROUS: &str = include_str!("../prompts/tone_humorous.md");
const TRANSLATOR_SYSTEM: &str = include_str!("../prompts/translator_system.md");

/// Headings every brochure must cover, translated into the target language
pub const SECTIONS: &[&str] = &[
    "Summary",
    "Value proposition",
    "Products/Services",
    "Customers",
    "Culture",
    "Careers",
    "Contact",
];

/// Per-category cap on content placed in the prompt, in characters
pub const MAX_CATEGORY_CHARS: usize = 8000;

/// Precedes the brochure inside a translation request
pub const TRANSLATION_MARKER: &str = "ORIGINAL BROCHURE:";

/// Writing style of the brochure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Formal,
    #[value(alias = "humoristico")]
    #[serde(alias = "humoristico")]
    Humorous,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Humorous => "humorous",
        }
    }

    fn prompt(&self) -> &'static str {
        match self {
            Tone::Formal => TONE_FORMAL,
            Tone::Humorous => TONE_HUMOROUS,
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates and translates brochures with a chat model
pub struct BrochureGenerator<M: ChatModel> {
    model: M,
    model_name: String,
    max_tokens: u32,
}

fn user_message(company: &str, content: &ConsolidatedContent, language: &str) -> String {
    let lang_name = language_name(language);
    let sections = SECTIONS
        .iter()
        .map(|section| format!("- {}", section))
        .collect::<Vec<_>>()
        .join("\n");

    let mut content_summary = String::new();
    for (category, text) in content {
        content_summary.push_str(&format!(
            "\n\n## [{}]\n{}\n",
            category.to_uppercase(),
            truncate_chars(text, MAX_CATEGORY_CHARS)
        ));
    }

    let today = Local::now().format("%Y-%m-%d");

    format!(
        "Company: {company}\n\n\
         IMPORTANT: Write the brochure in {lang_name}.\n\n\
         The brochure MUST use exactly these section headings, TRANSLATED INTO {lang_name} and formatted as Markdown (##):\n\
         {sections}\n\n\
         Content extracted from the website:\n\
         {content_summary}\n\n\
         Current date: {today}\n\n\
         Write the company brochure in Markdown."
    )
}

impl<M: ChatModel> BrochureGenerator<M> {
    pub fn new(model: M, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            max_tokens: 4000,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn complete_text(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        intent: Intent,
    ) -> Result<String> {
        let request = CompletionRequest {
            messages,
            model: self.model_name.clone(),
            max_tokens: self.max_tokens,
            temperature,
            intent,
        };

        match self.model.complete(request).await? {
            CompletionOutcome::Completed(completion) => {
                info!("Tokens used: {}", completion.usage.total);
                Ok(strip_code_fences(&completion.text, "markdown"))
            }
            CompletionOutcome::Unrecoverable { reason } => Err(Error::ModelUnavailable(reason)),
        }
    }

    /// Draft the brochure for `company` in `language`.
    #[instrument(skip(self, content), fields(categories = content.len()))]
    pub async fn generate(
        &self,
        company: &str,
        content: &ConsolidatedContent,
        tone: Tone,
        language: &str,
    ) -> Result<String> {
        if content.is_empty() {
            return Err(Error::EmptyContent(format!(
                "no compiled content to write a brochure for {}",
                company
            )));
        }

        let system_prompt = format!("{}\n\n{}", BROCHURE_SYSTEM.trim(), tone.prompt().trim());
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(user_message(company, content, language)),
        ];

        info!(
            "Generating brochure with {} (tone: {})...",
            self.model_name, tone
        );

        self.complete_text(
            messages,
            0.7,
            Intent::Brochure {
                company: company.to_string(),
                tone,
            },
        )
        .await
    }

    /// Translate a finished brochure, keeping its Markdown structure.
    #[instrument(skip(self, brochure))]
    pub async fn translate(&self, brochure: &str, language: &str) -> Result<String> {
        let lang_name = language_name(language);
        let user = format!(
            "Translate the following Markdown brochure into {}.\n\
             Preserve the formatting strictly.\n\n\
             {}\n{}",
            lang_name, TRANSLATION_MARKER, brochure
        );
        let messages = vec![
            ChatMessage::system(TRANSLATOR_SYSTEM.trim()),
            ChatMessage::user(user),
        ];

        info!("Translating brochure to {} with {}...", lang_name, self.model_name);

        self.complete_text(
            messages,
            0.3,
            Intent::Translation {
                language: language.to_string(),
            },
        )
        .await
    }
}
