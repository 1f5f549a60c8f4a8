//! # Scripted Chat Model for Testing
//!
//! Provides a `ScriptedChatModel` that implements the `ChatModel` trait for
//! use in tests. Replies are handed out in order, and every request is
//! recorded so tests can inspect the prompts that were sent.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{ChatModel, Completion, CompletionOutcome, CompletionRequest, TokenUsage};
use crate::error::{Error, Result};

/// One canned reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// A successful completion with this text
    Text(String),
    /// The backend gave up after retries
    Unrecoverable(String),
    /// A fatal credentials failure
    AuthFailure,
}

/// A chat model that replays a script of replies.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChatModel {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    fallback: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    usage: TokenUsage,
}

impl ScriptedChatModel {
    /// Creates a model that returns `replies` in order, then empty text.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    /// Creates a model that answers every request with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Report this usage on every successful reply.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let reply = {
            let mut guard = self.replies.lock().await;
            guard.pop_front()
        };
        let reply = reply.unwrap_or_else(|| {
            ScriptedReply::Text(self.fallback.clone().unwrap_or_default())
        });

        match reply {
            ScriptedReply::Text(text) => Ok(CompletionOutcome::Completed(Completion {
                text,
                model,
                usage: self.usage,
            })),
            ScriptedReply::Unrecoverable(reason) => Ok(CompletionOutcome::Unrecoverable { reason }),
            ScriptedReply::AuthFailure => Err(Error::Auth("scripted auth failure".to_string())),
        }
    }
}
