use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use tracing::{Instrument, debug_span, info_span};

use super::{ChatModel, CompletionOutcome, CompletionRequest};
use crate::error::Result;

/// Waits on a shared rate limiter before every completion
#[derive(Clone)]
pub struct RateLimitedChatModel<M: ChatModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedChatModel<M>
where
    M: ChatModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }

    pub fn inner(&self) -> &M {
        &self.model
    }
}

impl<M: ChatModel> ChatModel for RateLimitedChatModel<M> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("limiter"))
            .await;
        self.model
            .complete(request)
            .instrument(info_span!("completion"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use governor::{Quota, RateLimiter};

    use super::*;
    use crate::model::mock_model::ScriptedChatModel;
    use crate::model::{ChatMessage, Intent};

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            model: "gpt-4o-mini".to_string(),
            max_tokens: 10,
            temperature: 0.3,
            intent: Intent::LinkSelection,
        }
    }

    #[tokio::test]
    async fn test_passes_requests_through() {
        let quota = Quota::per_minute(NonZeroU32::new(600).unwrap());
        let inner = ScriptedChatModel::always("ok");
        let model = RateLimitedChatModel::new(inner, RateLimiter::direct(quota));

        for _ in 0..3 {
            let outcome = model.complete(request()).await.unwrap();
            assert_eq!(outcome.completion().unwrap().text, "ok");
        }

        assert_eq!(model.inner().requests().await.len(), 3);
    }
}
