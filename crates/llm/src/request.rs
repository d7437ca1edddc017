use axum::http::HeaderMap;

/// Correlation header. Lookup through [`HeaderMap`] is case-insensitive, so
/// both the canonical `X-Request-ID` and the lower-case form resolve here.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context handed to providers and upstream clients.
///
/// Owned by the request handler; carries the correlation ID so outbound
/// calls and logs can be tied back to the originating request, including
/// for the whole lifetime of a streaming response.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestContext {
    pub request_id: Option<String>,
}

/// Extract the request context from request headers. The correlation
/// middleware guarantees the header is present by the time handlers run.
pub(crate) fn extract_context(headers: &HeaderMap) -> RequestContext {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    RequestContext { request_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn either_casing_resolves() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("abc-123"));

        let context = extract_context(&headers);
        assert_eq!(context.request_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn absent_header_yields_none() {
        let context = extract_context(&HeaderMap::new());
        assert!(context.request_id.is_none());
    }
}
