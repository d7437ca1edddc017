use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GatewayError, extract::ValidateRequest};

pub(crate) const OBJECT_CHAT_COMPLETION: &str = "chat.completion";
pub(crate) const OBJECT_CHAT_COMPLETION_CHUNK: &str = "chat.completion.chunk";
pub(crate) const OBJECT_LIST: &str = "list";
pub(crate) const OBJECT_MODEL: &str = "model";
pub(crate) const OBJECT_EMBEDDING: &str = "embedding";

/// Fresh completion identifier, `chatcmpl-` followed by an opaque token.
pub(crate) fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Message role in OpenAI chat format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
    Developer,
    Function,
}

/// Message content: either a plain string or an ordered list of typed parts.
/// Both wire forms are accepted and preserved end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Project the content to a single string. Upstreams that reject the
    /// list form get the concatenation of the text parts.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }

    fn validate(&self) -> crate::Result<()> {
        match self {
            Self::Text(text) if text.trim().is_empty() => Err(GatewayError::Validation(
                "message content must be a non-empty string".into(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Chat message in OpenAI format. Unknown extra properties on messages are
/// accepted and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }
}

/// `stop` may be a single string or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum StopSequence {
    One(String),
    Many(Vec<String>),
}

impl StopSequence {
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::One(stop) => vec![stop.clone()],
            Self::Many(stops) => stops.clone(),
        }
    }
}

/// OpenAI-compatible chat completion request.
///
/// Known fields are typed and validated; anything else a fast-moving SDK
/// sends lands in `extra` and round-trips untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionRequest {
    pub fn wants_json_object(&self) -> bool {
        self.response_format
            .as_ref()
            .and_then(|format| format.get("type"))
            .and_then(Value::as_str)
            == Some("json_object")
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

impl ValidateRequest for ChatCompletionRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.model.trim().is_empty() {
            return Err(GatewayError::Validation("model must be a non-empty string".into()));
        }
        if self.messages.is_empty() {
            return Err(GatewayError::Validation(
                "messages must contain at least one message".into(),
            ));
        }
        for message in &self.messages {
            message.content.validate()?;
        }
        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(GatewayError::Validation("temperature must be between 0 and 2".into()));
        }
        if let Some(top_p) = self.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            return Err(GatewayError::Validation("top_p must be between 0 and 1".into()));
        }
        if self.max_tokens == Some(0) {
            return Err(GatewayError::Validation("max_tokens must be greater than 0".into()));
        }
        if self.n == Some(0) {
            return Err(GatewayError::Validation("n must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

impl FinishReason {
    /// Map an upstream done reason into the strict set; anything unknown
    /// (including a finished stream with no reason) counts as `stop`.
    pub fn from_done(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            Some("tool_calls") => Self::ToolCalls,
            _ => Self::Stop,
        }
    }
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
}

/// Token usage accounting. Zeroed when the upstream does not report counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn from_counts(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// OpenAI-compatible chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

/// Incremental payload of a streaming choice. The final chunk carries no
/// content, only the finish reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<FinishReason>,
}

/// Streaming unit: structurally a completion response with `delta` in place
/// of `message`. `id` and `created` are fixed across one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

/// Embedding input union: one string, many strings, one token sequence, or
/// many token sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum EmbeddingsInput {
    Text(String),
    Texts(Vec<String>),
    Tokens(Vec<i64>),
    TokenBatches(Vec<Vec<i64>>),
}

impl EmbeddingsInput {
    /// Collapse every supported input form into a list of prompt strings;
    /// token sequences become space-joined decimal strings.
    pub fn normalize_to_strings(&self) -> Vec<String> {
        fn join(tokens: &[i64]) -> String {
            tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ")
        }

        match self {
            Self::Text(text) => vec![text.clone()],
            Self::Texts(texts) => texts.clone(),
            Self::Tokens(tokens) => vec![join(tokens)],
            Self::TokenBatches(batches) => batches.iter().map(|batch| join(batch)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EncodingFormat {
    #[default]
    Float,
    Base64,
}

/// OpenAI-compatible embeddings request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EmbeddingsRequest {
    pub model: String,
    pub input: EmbeddingsInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub encoding_format: EncodingFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValidateRequest for EmbeddingsRequest {
    fn validate(&self) -> crate::Result<()> {
        if self.model.trim().is_empty() {
            return Err(GatewayError::Validation("model must be a non-empty string".into()));
        }
        if self.dimensions == Some(0) {
            return Err(GatewayError::Validation("dimensions must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EmbeddingItem {
    pub object: String,
    pub embedding: Vec<f32>,
    pub index: u32,
}

impl EmbeddingItem {
    pub fn new(embedding: Vec<f32>, index: u32) -> Self {
        Self {
            object: OBJECT_EMBEDDING.to_string(),
            embedding,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct EmbeddingsUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    pub object: String,
    pub data: Vec<EmbeddingItem>,
    pub model: String,
    pub usage: EmbeddingsUsage,
}

impl EmbeddingsResponse {
    pub fn new(model: impl Into<String>, data: Vec<EmbeddingItem>) -> Self {
        Self {
            object: OBJECT_LIST.to_string(),
            data,
            model: model.into(),
            usage: EmbeddingsUsage::default(),
        }
    }
}

/// Model descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, created: i64, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: OBJECT_MODEL.to_string(),
            created,
            owned_by: owned_by.into(),
        }
    }
}

/// Models list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    pub fn new(data: Vec<ModelInfo>) -> Self {
        Self {
            object: OBJECT_LIST.to_string(),
            data,
        }
    }
}

/// Deterministic small float vector derived from text via SHA-256. The same
/// input yields the same output across runs; values lie in [-1, 1).
pub(crate) fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    use sha2::{Digest, Sha256};

    let seed = Sha256::digest(text.as_bytes());
    let mut buf = seed.to_vec();
    let mut counter: u32 = 0;
    let mut values = Vec::with_capacity(dim);

    while values.len() < dim {
        for chunk in buf.chunks(4) {
            if values.len() >= dim {
                break;
            }
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let uint = u32::from_be_bytes(word);
            values.push(((f64::from(uint) / 4_294_967_296.0) * 2.0 - 1.0) as f32);
        }
        counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        buf = hasher.finalize().to_vec();
    }

    values
}
