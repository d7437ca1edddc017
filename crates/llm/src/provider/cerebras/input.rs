use serde::Serialize;
use serde_json::Value;

use crate::messages::{ChatCompletionRequest, ChatRole, MessageContent};

/// Request body for the Cerebras chat completions endpoint. The API is
/// OpenAI-shaped; message content unions pass through unchanged.
#[derive(Debug, Serialize)]
pub(super) struct CerebrasChatRequest {
    pub model: String,
    pub messages: Vec<CerebrasMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(super) struct CerebrasMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl From<&ChatCompletionRequest> for CerebrasChatRequest {
    fn from(request: &ChatCompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|message| CerebrasMessage {
                    role: message.role,
                    content: message.content.clone(),
                })
                .collect(),
            stream: false,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            seed: request.seed,
            stop: request.stop.as_ref().map(|stop| stop.as_list()),
            user: request.user.clone(),
            response_format: request.response_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_preserves_content_union_and_controls() {
        let request: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"llama3.1-8b","messages":[
                {"role":"system","content":"be terse"},
                {"role":"user","content":[{"type":"text","text":"hi"}]}],
                "temperature":0.2,"max_tokens":64,"stop":"END"}"#,
        )
        .unwrap();

        let wire = CerebrasChatRequest::from(&request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["model"], "llama3.1-8b");
        assert_eq!(json["messages"][0]["content"], "be terse");
        assert_eq!(json["messages"][1]["content"][0]["type"], "text");
        assert_eq!(json["stop"], serde_json::json!(["END"]));
        assert_eq!(json["stream"], false);
        assert!(json.get("seed").is_none());
    }
}
