mod client;
mod input;
mod output;

use async_trait::async_trait;
use config::Settings;

pub(crate) use client::CerebrasClient;

use self::input::CerebrasChatRequest;
use crate::{
    error::GatewayError,
    messages::{
        ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingsRequest,
        EmbeddingsResponse, FinishReason, ModelInfo, ModelList, OBJECT_CHAT_COMPLETION, Usage,
        completion_id, now_epoch,
    },
    provider::Provider,
    request::RequestContext,
};

/// Provider mapping OpenAI chat completions onto the Cerebras cloud API.
/// Streaming and embeddings are not offered by this upstream.
pub(crate) struct CerebrasProvider {
    client: CerebrasClient,
}

impl CerebrasProvider {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        Ok(Self {
            client: CerebrasClient::new(settings)?,
        })
    }
}

#[async_trait]
impl Provider for CerebrasProvider {
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

        let wire = CerebrasChatRequest::from(&request);
        let raw = self.client.chat(&wire, context).await?;

        let Some(first) = raw.choices.into_iter().next() else {
            log::error!("cerebras response carried no choices");
            return Err(GatewayError::upstream());
        };

        let content = first.message.and_then(|message| message.content).unwrap_or_default();
        let usage = raw
            .usage
            .map(|usage| {
                Usage::from_counts(
                    usage.prompt_tokens.unwrap_or(0),
                    usage.completion_tokens.unwrap_or(0),
                )
            })
            .unwrap_or_default();

        Ok(ChatCompletionResponse {
            id: completion_id(),
            object: OBJECT_CHAT_COMPLETION.to_string(),
            created: raw.created.filter(|created| *created > 0).unwrap_or_else(now_epoch),
            model: request.model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: FinishReason::from_done(first.finish_reason.as_deref()),
                logprobs: None,
            }],
            usage,
        })
    }

    async fn create_embeddings(
        &self,
        _request: EmbeddingsRequest,
        _context: &RequestContext,
    ) -> crate::Result<EmbeddingsResponse> {
        Err(GatewayError::NotImplemented("embeddings"))
    }

    async fn list_models(&self, context: &RequestContext) -> crate::Result<ModelList> {
        let raw = self.client.models(context).await?;

        let data = raw
            .data
            .into_iter()
            .map(|model| {
                ModelInfo::new(
                    model.id,
                    model.created.filter(|created| *created > 0).unwrap_or_else(now_epoch),
                    model.owned_by.unwrap_or_else(|| "cerebras".to_string()),
                )
            })
            .collect();

        Ok(ModelList::new(data))
    }

    fn name(&self) -> &'static str {
        "cerebras"
    }
}
