use serde::Deserialize;

/// Response body of the Cerebras chat completions endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct CerebrasChatResponse {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub choices: Vec<CerebrasChoice>,
    #[serde(default)]
    pub usage: Option<CerebrasUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CerebrasChoice {
    #[serde(default)]
    pub message: Option<CerebrasResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CerebrasResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CerebrasUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

/// Response body of the Cerebras models endpoint.
#[derive(Debug, Default, Deserialize)]
pub(super) struct CerebrasModelsResponse {
    #[serde(default)]
    pub data: Vec<CerebrasModel>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CerebrasModel {
    pub id: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub owned_by: Option<String>,
}
