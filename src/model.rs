//! # Chat Model Module
//!
//! This module provides the language-model capability the pipeline talks to,
//! with built-in rate limiting, token metering, and an offline backend.
//!
//! ## Key Components
//!
//! - `ChatModel`: The completion capability every backend implements
//! - `OpenAiChat`: Chat completions over HTTP with backoff on transient failures
//! - `RateLimitedChatModel`: A wrapper that adds rate limiting to any model
//! - `MeteredChatModel`: A wrapper that records token usage in `Metrics`
//! - `OfflineChatModel`: Fixture-backed answers for running without an API key
//! - `ModelBackend`: The live or offline stack, chosen once from configuration
//!
//! ## Error contract
//!
//! `complete` returns `Err` only for failures that retrying cannot fix
//! (bad credentials, malformed requests). Transient failures that outlast the
//! retry budget come back as `Ok(CompletionOutcome::Unrecoverable)` so the
//! caller can decide to short-circuit.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::metrics::Metrics;

pub mod metered;
pub mod mock_model;
pub mod offline;
pub mod openai;
pub mod ratelimited;
mod types;

pub use metered::MeteredChatModel;
pub use offline::OfflineChatModel;
pub use openai::{OpenAiChat, OpenAiOptions};
pub use ratelimited::RateLimitedChatModel;
pub use types::{
    ChatMessage, Completion, CompletionOutcome, CompletionRequest, Intent, Role, TokenUsage,
};

/// A backend that can complete a chat conversation
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome>;
}

impl<M: ChatModel> ChatModel for &M {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        (**self).complete(request).await
    }
}

/// The model stack the pipeline runs against
pub enum ModelBackend {
    Live(MeteredChatModel<RateLimitedChatModel<OpenAiChat>>),
    Offline(MeteredChatModel<OfflineChatModel>),
}

impl ModelBackend {
    /// Build the live stack from settings.
    ///
    /// Fails when no API key is configured or the HTTP client cannot be built.
    pub fn live(settings: &Settings, metrics: Arc<Metrics>) -> Result<Self> {
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;
        let options = OpenAiOptions {
            base_url: settings.openai_base_url.clone(),
            ..OpenAiOptions::default()
        };
        let chat = OpenAiChat::new(api_key, options)?;

        let per_minute = NonZeroU32::new(settings.requests_per_minute).ok_or_else(|| {
            Error::Config("requests per minute must be greater than zero".to_string())
        })?;
        let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        Ok(ModelBackend::Live(MeteredChatModel::new(
            RateLimitedChatModel::new(chat, limiter),
            metrics,
        )))
    }

    /// Build the offline stack over fixture content.
    pub fn offline(model: OfflineChatModel, metrics: Arc<Metrics>) -> Self {
        ModelBackend::Offline(MeteredChatModel::new(model, metrics))
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ModelBackend::Offline(_))
    }
}

impl ChatModel for ModelBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        match self {
            ModelBackend::Live(model) => model.complete(request).await,
            ModelBackend::Offline(model) => model.complete(request).await,
        }
    }
}
