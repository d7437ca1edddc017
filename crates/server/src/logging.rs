use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use llm::REQUEST_ID_HEADER;

use crate::redact;

/// Emit one structured access record per request: request_id, method, path,
/// provider namespace, status code, and duration. The correlation layer has
/// already stamped the request ID into the request headers by the time this
/// runs.
///
/// Request bodies, message content, and embedding vectors are never logged.
pub(crate) async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = redact::redact(request.uri().path());
    let provider = provider_for_path(request.uri().path());
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    log::info!(
        "request completed: method={method} path={path} provider={provider} status_code={} duration_ms={duration_ms:.2} request_id={request_id}",
        response.status().as_u16(),
    );

    response
}

/// Provider namespace owning a path, for the access record only; dispatch
/// itself is routing-table driven.
fn provider_for_path(path: &str) -> &'static str {
    if path == "/v1" || path.starts_with("/v1/") {
        "custom"
    } else if path == "/cerebras/v1" || path.starts_with("/cerebras/v1/") {
        "cerebras"
    } else if path == "/ollama/v1" || path.starts_with("/ollama/v1/") {
        "ollama"
    } else {
        "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_map_to_providers() {
        assert_eq!(provider_for_path("/v1/chat/completions"), "custom");
        assert_eq!(provider_for_path("/cerebras/v1/models"), "cerebras");
        assert_eq!(provider_for_path("/ollama/v1/embeddings"), "ollama");
        assert_eq!(provider_for_path("/healthz"), "-");
        assert_eq!(provider_for_path("/v1x/models"), "-");
    }
}
