//! OpenAI-compatible gateway core: request/response schemas, the provider
//! abstraction and its three implementations, the streaming pipeline, and
//! the namespaced routers that tie them together.

use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use config::Settings;

mod error;
mod extract;
mod messages;
mod provider;
mod request;
mod sse;

pub use error::{ErrorEnvelope, GatewayError};
pub use request::REQUEST_ID_HEADER;

pub type Result<T> = std::result::Result<T, GatewayError>;

use extract::ValidatedJson;
use messages::{ChatCompletionRequest, EmbeddingsRequest};
use provider::{Provider, cerebras::CerebrasProvider, custom::CustomProvider, ollama::OllamaProvider};

/// Build the namespaced provider routers: `/v1` (custom echo),
/// `/cerebras/v1` (cloud), `/ollama/v1` (local runner). Each namespace
/// exposes the same three operations with its provider injected as state.
pub fn router(settings: &Arc<Settings>) -> anyhow::Result<Router> {
    let custom: Arc<dyn Provider> = Arc::new(CustomProvider::new());
    let cerebras: Arc<dyn Provider> = Arc::new(
        CerebrasProvider::new(settings)
            .map_err(|e| anyhow::anyhow!("failed to initialize the cerebras provider: {e}"))?,
    );
    let ollama: Arc<dyn Provider> = Arc::new(
        OllamaProvider::new(settings)
            .map_err(|e| anyhow::anyhow!("failed to initialize the ollama provider: {e}"))?,
    );

    Ok(Router::new()
        .nest("/v1", provider_routes(custom))
        .nest("/cerebras/v1", provider_routes(cerebras))
        .nest("/ollama/v1", provider_routes(ollama)))
}

fn provider_routes(provider: Arc<dyn Provider>) -> Router {
    Router::new()
        .route("/chat/completions", post(chat_completions))
        .route("/embeddings", post(create_embeddings))
        .route("/models", get(list_models))
        .with_state(provider)
}

/// Handle chat completion requests, unary or streaming.
///
/// The stream flag is the only branch here: `stream=true` turns the provider
/// chunk stream into Server-Sent Events, everything else is a plain JSON
/// response. Provider selection happened at routing time.
async fn chat_completions(
    State(provider): State<Arc<dyn Provider>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<ChatCompletionRequest>,
) -> Result<Response> {
    let context = request::extract_context(&headers);

    log::debug!(
        "chat completions via {}: model={} messages={} stream={}",
        provider.name(),
        request.model,
        request.messages.len(),
        request.is_streaming(),
    );

    if request.is_streaming() {
        let chunks = provider.stream_chat_completions(request, &context).await?;
        Ok(sse::chunk_stream_response(chunks))
    } else {
        let response = provider.chat_completions(request, &context).await?;
        Ok(Json(response).into_response())
    }
}

async fn create_embeddings(
    State(provider): State<Arc<dyn Provider>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<EmbeddingsRequest>,
) -> Result<Response> {
    let context = request::extract_context(&headers);
    let response = provider.create_embeddings(request, &context).await?;
    Ok(Json(response).into_response())
}

async fn list_models(State(provider): State<Arc<dyn Provider>>, headers: HeaderMap) -> Result<Response> {
    let context = request::extract_context(&headers);
    let response = provider.list_models(&context).await?;

    log::debug!("{} provider lists {} models", provider.name(), response.data.len());
    Ok(Json(response).into_response())
}
