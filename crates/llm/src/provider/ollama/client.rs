use std::time::Duration;

use config::Settings;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::json;

use super::{
    input::OllamaChatBody,
    output::{OllamaChatResponse, OllamaEmbeddingsResponse, OllamaTagsResponse},
};
use crate::{
    error::GatewayError,
    messages::ChatRole,
    request::{REQUEST_ID_HEADER, RequestContext},
    sse::parser::{JsonRecordStream, parse_json_record_stream},
};

pub(super) const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Thin wire-I/O wrapper for the Ollama API. Owns no translation logic.
///
/// When the configured base URL is the localhost default and the transport
/// itself fails (connection refused, DNS), unary calls fall back to
/// deterministic canned shapes so development and CI stay hermetic. Explicit
/// HTTP error statuses and timeouts are never masked.
pub(crate) struct OllamaClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        let http = Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| {
                log::error!("failed to create HTTP client for the ollama provider: {e}");
                GatewayError::Internal
            })?;

        let base_url = settings
            .ollama_host
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self::with_http_client(http, base_url, settings.request_timeout()))
    }

    /// Build around a caller-provided transport. The client keeps no
    /// ownership claims beyond using it; `reqwest::Client` is reference
    /// counted, so the caller's handle stays valid.
    pub fn with_http_client(http: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn masks_transport_errors(&self) -> bool {
        self.base_url.starts_with(DEFAULT_OLLAMA_URL)
    }

    fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T, context: &RequestContext) -> RequestBuilder {
        let builder = self.http.post(format!("{}{path}", self.base_url)).json(body);
        with_request_id(builder, context)
    }

    /// `POST /api/chat`, non-streaming.
    pub async fn chat(&self, body: &OllamaChatBody, context: &RequestContext) -> crate::Result<OllamaChatResponse> {
        let sent = self
            .post_json("/api/chat", body, context)
            .timeout(self.timeout)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_connect() && self.masks_transport_errors() => {
                log::debug!("ollama unreachable on localhost, serving canned chat reply: {e}");
                return Ok(canned_chat_reply(body));
            }
            Err(e) => return Err(transport_error("chat", &e)),
        };

        let response = check_status("chat", response).await?;
        decode_json(response).await
    }

    /// `POST /api/chat` with `stream: true`. The timeout bounds the initial
    /// call only, not the lifetime of the stream.
    pub async fn chat_stream(&self, body: &OllamaChatBody, context: &RequestContext) -> crate::Result<JsonRecordStream> {
        let sent = self.post_json("/api/chat", body, context).send();

        let response = match tokio::time::timeout(self.timeout, sent).await {
            Err(_) => {
                log::warn!("ollama streaming chat timed out after {:?}", self.timeout);
                return Err(GatewayError::Provider("upstream request timed out".into()));
            }
            Ok(Err(e)) => return Err(transport_error("chat stream", &e)),
            Ok(Ok(response)) => response,
        };

        let response = check_status("chat stream", response).await?;
        Ok(parse_json_record_stream(Box::pin(response.bytes_stream())))
    }

    /// `GET /api/tags`.
    pub async fn tags(&self, context: &RequestContext) -> crate::Result<OllamaTagsResponse> {
        let builder = with_request_id(self.http.get(format!("{}/api/tags", self.base_url)), context);
        let sent = builder.timeout(self.timeout).send().await;

        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_connect() && self.masks_transport_errors() => {
                log::debug!("ollama unreachable on localhost, serving canned tag list: {e}");
                return Ok(canned_tags());
            }
            Err(e) => return Err(transport_error("tags", &e)),
        };

        let response = check_status("tags", response).await?;
        decode_json(response).await
    }

    /// `POST /api/embeddings`, one prompt per call.
    pub async fn embeddings(
        &self,
        model: &str,
        prompt: &str,
        dimensions: Option<u32>,
        context: &RequestContext,
    ) -> crate::Result<OllamaEmbeddingsResponse> {
        let mut body = json!({"model": model, "prompt": prompt});
        if let Some(dimensions) = dimensions.filter(|d| *d > 0) {
            body["dimensions"] = dimensions.into();
        }

        let sent = self
            .post_json("/api/embeddings", &body, context)
            .timeout(self.timeout)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_connect() && self.masks_transport_errors() => {
                log::debug!("ollama unreachable on localhost, serving canned embedding: {e}");
                return Ok(canned_embedding(dimensions));
            }
            Err(e) => return Err(transport_error("embeddings", &e)),
        };

        let response = check_status("embeddings", response).await?;
        decode_json(response).await
    }
}

fn with_request_id(builder: RequestBuilder, context: &RequestContext) -> RequestBuilder {
    match &context.request_id {
        Some(request_id) => builder.header(REQUEST_ID_HEADER, request_id),
        None => builder,
    }
}

fn transport_error(operation: &str, e: &reqwest::Error) -> GatewayError {
    log::error!("ollama {operation} transport failure: {e}");
    if e.is_timeout() {
        GatewayError::Provider("upstream request timed out".into())
    } else {
        GatewayError::upstream()
    }
}

async fn check_status(operation: &str, response: reqwest::Response) -> crate::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    log::error!("ollama {operation} returned {status}: {detail}");
    Err(GatewayError::Provider(format!("upstream returned HTTP {}", status.as_u16())))
}

async fn decode_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> crate::Result<T> {
    let text = response.text().await.map_err(|e| {
        log::error!("failed to read ollama response body: {e}");
        GatewayError::upstream()
    })?;

    sonic_rs::from_str(&text).map_err(|e| {
        log::error!("failed to decode ollama response: {e}");
        GatewayError::Provider("upstream returned a malformed response".into())
    })
}

fn canned_chat_reply(body: &OllamaChatBody) -> OllamaChatResponse {
    let last_user = body
        .messages
        .iter()
        .rev()
        .find(|message| message.role == ChatRole::User)
        .map(|message| message.content.to_text())
        .unwrap_or_default();

    OllamaChatResponse {
        message: Some(super::output::OllamaMessage {
            content: format!("Ollama mock reply to: {last_user}").trim().to_string(),
        }),
        done_reason: Some("stop".to_string()),
        ..Default::default()
    }
}

fn canned_tags() -> OllamaTagsResponse {
    sonic_rs::from_str(r#"{"models":[{"name":"ollama-tiny"},{"name":"ollama-medium"}]}"#)
        .unwrap_or_default()
}

fn canned_embedding(dimensions: Option<u32>) -> OllamaEmbeddingsResponse {
    let dim = match dimensions {
        Some(d) if d > 0 && d <= 2048 => d as usize,
        _ => 16,
    };
    let base: Vec<f32> = (0..dim).map(|i| ((i % 10) as f32 - 5.0) / 5.0).collect();

    OllamaEmbeddingsResponse {
        embedding: Some(base),
        ..Default::default()
    }
}
