use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::messages::{ChatCompletionRequest, ChatRole, MessageContent};

/// Request body for the Ollama `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub(super) struct OllamaChatBody {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub(super) struct OllamaChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl OllamaChatBody {
    /// Unary body: message content passes through in whichever wire form the
    /// client sent it.
    pub fn unary(request: &ChatCompletionRequest, enrichment: bool) -> Self {
        Self::build(request, false, enrichment)
    }

    /// Streaming body. Content parts are projected to a single string here:
    /// the upstream rejects the list form on the streaming path with HTTP 400.
    pub fn streaming(request: &ChatCompletionRequest, enrichment: bool) -> Self {
        let mut body = Self::build(request, true, enrichment);
        for message in &mut body.messages {
            if let MessageContent::Parts(_) = message.content {
                message.content = MessageContent::Text(message.content.to_text());
            }
        }
        body
    }

    fn build(request: &ChatCompletionRequest, stream: bool, enrichment: bool) -> Self {
        let json_format = request.wants_json_object();

        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|message| OllamaChatMessage {
                    role: message.role,
                    content: message.content.clone(),
                    tool_call_id: message.tool_call_id.clone(),
                })
                .collect(),
            stream,
            options: build_options(request, json_format, enrichment),
            format: json_format.then_some("json"),
        }
    }
}

/// Translate OpenAI generation controls into the upstream options map.
///
/// `max_tokens` becomes `num_predict` and `stop` is always a list; the rest
/// copy through under their own names. Tool selectors are captured for
/// orchestration even though the upstream ignores them today.
fn build_options(request: &ChatCompletionRequest, json_format: bool, enrichment: bool) -> Map<String, Value> {
    let mut options = Map::new();

    if let Some(max_tokens) = request.max_tokens {
        options.insert("num_predict".into(), max_tokens.into());
    }
    if let Some(stop) = &request.stop {
        options.insert("stop".into(), stop.as_list().into());
    }
    if let Some(temperature) = request.temperature {
        options.insert("temperature".into(), temperature.into());
    }
    if let Some(top_p) = request.top_p {
        options.insert("top_p".into(), top_p.into());
    }
    if let Some(top_k) = request.top_k {
        options.insert("top_k".into(), top_k.into());
    }
    if let Some(seed) = request.seed {
        options.insert("seed".into(), seed.into());
    }
    if let Some(presence_penalty) = request.presence_penalty {
        options.insert("presence_penalty".into(), presence_penalty.into());
    }
    if let Some(frequency_penalty) = request.frequency_penalty {
        options.insert("frequency_penalty".into(), frequency_penalty.into());
    }
    if let Some(logprobs) = request.logprobs {
        options.insert("logprobs".into(), logprobs.into());
    }
    if let Some(logit_bias) = &request.logit_bias
        && let Ok(value) = serde_json::to_value(logit_bias)
    {
        options.insert("logit_bias".into(), value);
    }
    if let Some(n) = request.n {
        options.insert("n".into(), n.into());
    }
    if let Some(user) = &request.user {
        options.insert("user".into(), user.clone().into());
    }

    if let Some(tools) = &request.tools {
        options.insert("tools".into(), tools.clone().into());
    }
    if let Some(tool_choice) = &request.tool_choice {
        options.insert("tool_choice".into(), tool_choice.clone());
    }
    if let Some(function_call) = &request.function_call {
        options.insert("function_call".into(), function_call.clone());
    }

    if json_format {
        options.entry("structured").or_insert(Value::Bool(true));
        if enrichment {
            options.entry("enforce_structured").or_insert(Value::Bool(true));
        }
    }
    if enrichment {
        options.entry("enrichment").or_insert(json!({"enabled": true}));
    }

    options
}
