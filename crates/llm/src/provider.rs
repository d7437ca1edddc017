pub(crate) mod cerebras;
pub(crate) mod custom;
pub(crate) mod ollama;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::{
    error::GatewayError,
    messages::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest, EmbeddingsResponse, ModelList},
    request::RequestContext,
};

/// A stream of chat completion chunks produced incrementally by a provider.
/// Pinned and boxed for dynamic dispatch across provider implementations.
pub(crate) type ChatCompletionStream = Pin<Box<dyn Stream<Item = crate::Result<ChatCompletionChunk>> + Send>>;

/// Capability set every upstream translation implements.
///
/// Providers own the OpenAI-to-upstream and upstream-to-OpenAI mapping; wire
/// I/O lives in the per-provider client. A provider method either returns a
/// valid typed response or a [`GatewayError`] — nothing else escapes.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Create a unary chat completion. Rejects `stream=true` bodies; the
    /// router sends those to [`Provider::stream_chat_completions`].
    async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionResponse>;

    /// Create a streaming chat completion.
    ///
    /// The default implementation reports the capability as unavailable,
    /// which the router surfaces as HTTP 501.
    async fn stream_chat_completions(
        &self,
        _request: ChatCompletionRequest,
        _context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream> {
        Err(GatewayError::NotImplemented("streaming"))
    }

    /// Create embeddings for the request input.
    async fn create_embeddings(
        &self,
        request: EmbeddingsRequest,
        context: &RequestContext,
    ) -> crate::Result<EmbeddingsResponse>;

    /// List the models this provider serves.
    async fn list_models(&self, context: &RequestContext) -> crate::Result<ModelList>;

    /// Provider name, used in logs.
    fn name(&self) -> &'static str;
}
