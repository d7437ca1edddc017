mod client;
mod input;
mod output;

use async_trait::async_trait;
use config::Settings;
use futures::{StreamExt, stream};
use serde_json::Value;

pub(crate) use client::OllamaClient;

use self::{
    input::OllamaChatBody,
    output::epoch_from_iso,
};
use crate::{
    error::GatewayError,
    messages::{
        ChatChoice, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
        ChunkChoice, ChunkDelta, EmbeddingItem, EmbeddingsRequest, EmbeddingsResponse, FinishReason,
        ModelInfo, ModelList, OBJECT_CHAT_COMPLETION, OBJECT_CHAT_COMPLETION_CHUNK, Usage,
        completion_id, deterministic_vector, now_epoch,
    },
    provider::{ChatCompletionStream, Provider},
    request::RequestContext,
};

/// Provider adapting OpenAI chat completions to the local Ollama runner.
/// The only provider with native streaming support.
pub(crate) struct OllamaProvider {
    client: OllamaClient,
    enrichment: bool,
}

impl OllamaProvider {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        Ok(Self {
            client: OllamaClient::new(settings)?,
            enrichment: settings.enable_enrichment,
        })
    }
}

/// Stream-constant fields, fixed at first-chunk time.
struct ChunkMeta {
    id: String,
    created: i64,
    model: String,
}

impl ChunkMeta {
    fn content_chunk(&self, piece: String) -> ChatCompletionChunk {
        self.chunk(ChunkDelta { content: Some(piece) }, None)
    }

    fn finish_chunk(&self, reason: FinishReason) -> ChatCompletionChunk {
        self.chunk(ChunkDelta::default(), Some(reason))
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: OBJECT_CHAT_COMPLETION_CHUNK.to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

fn content_piece(record: &Value) -> Option<&str> {
    record
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|piece| !piece.is_empty())
}

fn is_done(record: &Value) -> bool {
    record.get("done").and_then(Value::as_bool) == Some(true)
}

/// Map upstream records onto completion chunks. Records map 1:0-or-1 to
/// chunks: content pieces pass through in arrival order, the done record
/// becomes the final chunk, and anything after it is dropped.
fn map_record_stream(upstream: crate::sse::parser::JsonRecordStream, meta: ChunkMeta) -> ChatCompletionStream {
    let chunks = stream::unfold((upstream, meta, false), |(mut upstream, meta, finished)| async move {
        if finished {
            return None;
        }

        loop {
            match upstream.next().await {
                None => return None,
                Some(Err(e)) => return Some((Err(e), (upstream, meta, true))),
                Some(Ok(record)) => {
                    if is_done(&record) {
                        let reason = FinishReason::from_done(record.get("done_reason").and_then(Value::as_str));
                        let chunk = meta.finish_chunk(reason);
                        return Some((Ok(chunk), (upstream, meta, true)));
                    }
                    if let Some(piece) = content_piece(&record) {
                        let chunk = meta.content_chunk(piece.to_string());
                        return Some((Ok(chunk), (upstream, meta, false)));
                    }
                }
            }
        }
    });

    Box::pin(chunks)
}

#[async_trait]
impl Provider for OllamaProvider {
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

        let body = OllamaChatBody::unary(&request, self.enrichment);
        let raw = self.client.chat(&body, context).await?;

        let content = raw.message.map(|message| message.content).unwrap_or_default();
        let usage = Usage::from_counts(
            raw.prompt_eval_count.unwrap_or(0),
            raw.eval_count.unwrap_or(0),
        );

        Ok(ChatCompletionResponse {
            id: completion_id(),
            object: OBJECT_CHAT_COMPLETION.to_string(),
            created: epoch_from_iso(raw.created_at.as_deref()),
            model: request.model,
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: FinishReason::from_done(raw.done_reason.as_deref()),
                logprobs: None,
            }],
            usage,
        })
    }

    async fn stream_chat_completions(
        &self,
        request: ChatCompletionRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream> {
        let body = OllamaChatBody::streaming(&request, self.enrichment);
        let upstream = self.client.chat_stream(&body, context).await?;

        let meta = ChunkMeta {
            id: completion_id(),
            created: now_epoch(),
            model: request.model,
        };

        Ok(map_record_stream(upstream, meta))
    }

    async fn create_embeddings(
        &self,
        request: EmbeddingsRequest,
        context: &RequestContext,
    ) -> crate::Result<EmbeddingsResponse> {
        let prompts = request.input.normalize_to_strings();
        let mut data = Vec::with_capacity(prompts.len());

        // One upstream call per input element, sequential to keep result
        // order equal to input order.
        for (index, prompt) in prompts.iter().enumerate() {
            let raw = self
                .client
                .embeddings(&request.model, prompt, request.dimensions, context)
                .await?;

            let embedding = raw.into_vector().unwrap_or_else(|| {
                let dim = request.dimensions.map(|d| d as usize).unwrap_or(16);
                deterministic_vector(prompt, dim)
            });

            data.push(EmbeddingItem::new(embedding, index as u32));
        }

        Ok(EmbeddingsResponse::new(request.model, data))
    }

    async fn list_models(&self, context: &RequestContext) -> crate::Result<ModelList> {
        let tags = self.client.tags(context).await?;

        let data = tags
            .models
            .iter()
            .filter_map(|tag| {
                let name = tag.name.as_deref()?.trim();
                if name.is_empty() {
                    return None;
                }
                Some(ModelInfo::new(name, epoch_from_iso(tag.timestamp()), "ollama"))
            })
            .collect();

        Ok(ModelList::new(data))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
