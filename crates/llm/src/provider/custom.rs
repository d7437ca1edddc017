use async_trait::async_trait;

use crate::{
    error::GatewayError,
    messages::{
        ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingItem,
        EmbeddingsRequest, EmbeddingsResponse, FinishReason, ModelInfo, ModelList, OBJECT_CHAT_COMPLETION,
        Usage, completion_id, deterministic_vector, now_epoch,
    },
    provider::Provider,
    request::RequestContext,
};

const DEFAULT_EMBEDDING_DIM: usize = 16;

/// Deterministic echo provider behind the gateway's own `/v1` namespace.
///
/// Performs no external calls and produces stable, typed responses suitable
/// for contract testing and development. Never logs message content.
pub(crate) struct CustomProvider;

impl CustomProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for CustomProvider {
    async fn chat_completions(
        &self,
        request: ChatCompletionRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionResponse> {
        if request.is_streaming() {
            return Err(GatewayError::Provider(
                "streaming requests must use the streaming endpoint".into(),
            ));
        }

        let created = now_epoch();
        let id = completion_id();

        log::info!(
            "custom provider request: model={} messages={} request_id={}",
            request.model,
            request.messages.len(),
            context.request_id.as_deref().unwrap_or("-"),
        );

        Ok(ChatCompletionResponse {
            id,
            object: OBJECT_CHAT_COMPLETION.to_string(),
            created,
            model: request.model.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(format!("Hello from the custom provider ({}).", request.model)),
                finish_reason: FinishReason::Stop,
                logprobs: None,
            }],
            usage: Usage::default(),
        })
    }

    async fn create_embeddings(
        &self,
        request: EmbeddingsRequest,
        _context: &RequestContext,
    ) -> crate::Result<EmbeddingsResponse> {
        let dim = request.dimensions.map(|d| d as usize).unwrap_or(DEFAULT_EMBEDDING_DIM);

        let data = request
            .input
            .normalize_to_strings()
            .iter()
            .enumerate()
            .map(|(index, text)| EmbeddingItem::new(deterministic_vector(text, dim), index as u32))
            .collect();

        Ok(EmbeddingsResponse::new(request.model, data))
    }

    async fn list_models(&self, _context: &RequestContext) -> crate::Result<ModelList> {
        // Fixed catalog; the created stamp is arbitrary but stable.
        const CATALOG_CREATED: i64 = 1_719_792_000;

        Ok(ModelList::new(vec![
            ModelInfo::new("custom-echo", CATALOG_CREATED, "custom"),
            ModelInfo::new("custom-echo-mini", CATALOG_CREATED, "custom"),
        ]))
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> ChatCompletionRequest {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn chat_response_has_openai_shape() {
        let provider = CustomProvider::new();
        let response = provider
            .chat_completions(
                request(r#"{"model":"m","messages":[{"role":"user","content":"hi"}]}"#),
                &RequestContext::default(),
            )
            .await
            .unwrap();

        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.object, "chat.completion");
        assert!(response.created > 0);
        assert_eq!(response.model, "m");
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn unary_chat_rejects_stream_flag() {
        let provider = CustomProvider::new();
        let result = provider
            .chat_completions(
                request(r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"stream":true}"#),
                &RequestContext::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::Provider(_))));
    }

    #[tokio::test]
    async fn embeddings_honor_requested_dimensions() {
        let provider = CustomProvider::new();
        let response = provider
            .create_embeddings(
                serde_json::from_str(r#"{"model":"m","input":["a","b"],"dimensions":8}"#).unwrap(),
                &RequestContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].embedding.len(), 8);
        assert_eq!(response.data[1].index, 1);
        assert_eq!(response.object, "list");
    }

    #[tokio::test]
    async fn streaming_is_not_implemented() {
        let provider = CustomProvider::new();
        let result = provider
            .stream_chat_completions(
                request(r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"stream":true}"#),
                &RequestContext::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::NotImplemented(_))));
    }
}
