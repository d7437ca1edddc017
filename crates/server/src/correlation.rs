use axum::{extract::Request, middleware::Next, response::Response};
use http::HeaderValue;
use llm::REQUEST_ID_HEADER;

/// Ensure every request carries a stable correlation ID, taken from the
/// incoming `X-Request-ID` header (either casing; header lookup is
/// case-insensitive) or freshly generated.
///
/// The ID is written back into the request headers so handlers, providers,
/// and upstream clients read one consistent value for the whole request —
/// including the full lifetime of a streaming response — and is echoed on
/// the response.
pub(crate) async fn propagate(mut request: Request, next: Next) -> Response {
    let header_value = match incoming_id(&request).and_then(|id| HeaderValue::from_str(&id).ok()) {
        Some(value) => value,
        None => HeaderValue::from_str(&generate_request_id()).expect("generated request id is ascii"),
    };

    request.headers_mut().insert(REQUEST_ID_HEADER, header_value.clone());

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    response
}

fn incoming_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
