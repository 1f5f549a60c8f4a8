use std::sync::Arc;

use super::{ChatModel, CompletionOutcome, CompletionRequest};
use crate::error::Result;
use crate::metrics::Metrics;

/// Records token usage of every successful completion
#[derive(Clone)]
pub struct MeteredChatModel<M: ChatModel> {
    model: M,
    metrics: Arc<Metrics>,
}

impl<M: ChatModel> MeteredChatModel<M> {
    pub fn new(model: M, metrics: Arc<Metrics>) -> Self {
        Self { model, metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl<M: ChatModel> ChatModel for MeteredChatModel<M> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        // Prices are keyed on the requested model, not the dated variant the API echoes back
        let model = request.model.clone();
        let outcome = self.model.complete(request).await?;
        if let CompletionOutcome::Completed(completion) = &outcome {
            self.metrics.add_tokens(&model, &completion.usage);
        }
        Ok(outcome)
    }
}
