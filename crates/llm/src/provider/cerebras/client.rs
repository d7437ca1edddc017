use std::time::Duration;

use config::Settings;
use reqwest::{Client, RequestBuilder, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use super::{
    input::CerebrasChatRequest,
    output::{CerebrasChatResponse, CerebrasModelsResponse},
};
use crate::{
    error::GatewayError,
    messages::ChatRole,
    request::{REQUEST_ID_HEADER, RequestContext},
};

const DEFAULT_CEREBRAS_URL: &str = "https://api.cerebras.ai/v1";

/// Thin wire-I/O wrapper for the Cerebras cloud API. No fallback: transport
/// errors propagate for normalization by the provider.
///
/// In development mode with no API key configured, the client serves a
/// deterministic stub so local runs stay hermetic; production use without a
/// key fails on first exercise.
pub(crate) struct CerebrasClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
    mock_mode: bool,
}

impl CerebrasClient {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        let http = Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| {
                log::error!("failed to create HTTP client for the cerebras provider: {e}");
                GatewayError::Internal
            })?;

        let api_key = settings.cerebras_api_key.clone();
        let mock_mode = settings.development_mode && api_key.is_none();

        Ok(Self {
            http,
            base_url: settings
                .cerebras_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_CEREBRAS_URL.to_string()),
            api_key,
            timeout: settings.request_timeout(),
            mock_mode,
        })
    }

    fn authorized(&self, builder: RequestBuilder, context: &RequestContext) -> crate::Result<RequestBuilder> {
        let Some(api_key) = &self.api_key else {
            log::error!("cerebras API key is not configured");
            return Err(GatewayError::upstream());
        };

        let builder = builder.header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()));
        Ok(match &context.request_id {
            Some(request_id) => builder.header(REQUEST_ID_HEADER, request_id),
            None => builder,
        })
    }

    pub async fn chat(
        &self,
        request: &CerebrasChatRequest,
        context: &RequestContext,
    ) -> crate::Result<CerebrasChatResponse> {
        if self.mock_mode {
            return Ok(mock_chat_response(request));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let builder = self.authorized(self.http.post(url), context)?;

        let response = builder
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("cerebras chat transport failure: {e}");
                if e.is_timeout() {
                    GatewayError::Provider("upstream request timed out".into())
                } else {
                    GatewayError::upstream()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::error!("cerebras chat returned {status}: {detail}");
            return Err(GatewayError::Provider(format!(
                "upstream returned HTTP {}",
                status.as_u16()
            )));
        }

        let text = response.text().await.map_err(|e| {
            log::error!("failed to read cerebras response body: {e}");
            GatewayError::upstream()
        })?;

        sonic_rs::from_str(&text).map_err(|e| {
            log::error!("failed to decode cerebras chat response: {e}");
            GatewayError::Provider("upstream returned a malformed response".into())
        })
    }

    pub async fn models(&self, context: &RequestContext) -> crate::Result<CerebrasModelsResponse> {
        if self.mock_mode {
            return Ok(mock_models_response());
        }

        let url = format!("{}/models", self.base_url);
        let builder = self.authorized(self.http.get(url), context)?;

        let response = builder.timeout(self.timeout).send().await.map_err(|e| {
            log::error!("cerebras models transport failure: {e}");
            GatewayError::upstream()
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::error!("cerebras models returned {status}: {detail}");
            return Err(GatewayError::Provider(format!(
                "upstream returned HTTP {}",
                status.as_u16()
            )));
        }

        let text = response.text().await.map_err(|e| {
            log::error!("failed to read cerebras models body: {e}");
            GatewayError::upstream()
        })?;

        sonic_rs::from_str(&text).map_err(|e| {
            log::error!("failed to decode cerebras models response: {e}");
            GatewayError::Provider("upstream returned a malformed response".into())
        })
    }
}

/// Deterministic development-mode reply echoing the last user message.
fn mock_chat_response(request: &CerebrasChatRequest) -> CerebrasChatResponse {
    let last_user = request
        .messages
        .iter()
        .rev()
        .find(|message| message.role == ChatRole::User)
        .map(|message| message.content.to_text())
        .unwrap_or_default();

    let payload = serde_json::json!({
        "created": 0,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": format!("[cerebras-mock:{}] echo: {last_user}", request.model)},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
    });

    serde_json::from_value(payload).unwrap_or(CerebrasChatResponse {
        created: None,
        choices: Vec::new(),
        usage: None,
    })
}

fn mock_models_response() -> CerebrasModelsResponse {
    serde_json::from_value(serde_json::json!({
        "data": [
            {"id": "llama3.1-8b", "created": 0, "owned_by": "cerebras"},
            {"id": "llama3.1-70b", "created": 0, "owned_by": "cerebras"}
        ]
    }))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_vars(&vars).unwrap()
    }

    fn chat_request(model: &str, user_text: &str) -> CerebrasChatRequest {
        let request: crate::messages::ChatCompletionRequest = serde_json::from_str(&format!(
            r#"{{"model":"{model}","messages":[{{"role":"user","content":"{user_text}"}}]}}"#
        ))
        .unwrap();
        CerebrasChatRequest::from(&request)
    }

    #[tokio::test]
    async fn dev_mode_without_key_serves_deterministic_stub() {
        let client = CerebrasClient::new(&settings(&[("DEVELOPMENT_MODE", "true")])).unwrap();
        assert!(client.mock_mode);

        let response = client
            .chat(&chat_request("llama3.1-8b", "hello"), &RequestContext::default())
            .await
            .unwrap();

        let content = response.choices[0].message.as_ref().unwrap().content.clone().unwrap();
        assert_eq!(content, "[cerebras-mock:llama3.1-8b] echo: hello");

        let models = client.models(&RequestContext::default()).await.unwrap();
        assert_eq!(models.data.len(), 2);
    }

    #[tokio::test]
    async fn missing_key_outside_dev_mode_fails_when_exercised() {
        let client = CerebrasClient::new(&settings(&[("REQUIRE_AUTH", "false")])).unwrap();
        assert!(!client.mock_mode);

        let result = client
            .chat(&chat_request("llama3.1-8b", "hello"), &RequestContext::default())
            .await;

        assert!(matches!(result, Err(GatewayError::Provider(_))));
    }

    #[test]
    fn configured_key_disables_mock_mode() {
        let client = CerebrasClient::new(&settings(&[
            ("DEVELOPMENT_MODE", "true"),
            ("CEREBRAS_API_KEY", "csk-test"),
        ]))
        .unwrap();
        assert!(!client.mock_mode);
    }
}
