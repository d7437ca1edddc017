//! End-to-end tests over the composed application, driven without a socket.

use std::{collections::HashMap, sync::Arc};

use axum::{Router, body::Body};
use config::Settings;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app(pairs: &[(&str, &str)]) -> Router {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let settings = Arc::new(Settings::from_vars(&vars).expect("test settings are valid"));
    server::app(settings).expect("app builds")
}

fn default_app() -> Router {
    test_app(&[("ALLOWED_API_KEYS", "test-key")])
}

async fn send(app: Router, request: Request<Body>) -> (http::response::Parts, Value) {
    let response = app.oneshot(request).await.expect("request handled");
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.expect("body collected").to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };
    (parts, json)
}

fn post_json(uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).expect("request builds")
}

fn chat_body() -> Value {
    json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]})
}

#[tokio::test]
async fn health_is_unauthenticated_and_correlated() {
    let (parts, body) = send(default_app(), get("/healthz", None)).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    // Case-insensitive lookup: both casings of the correlation header
    // resolve to the same generated value.
    let id = parts.headers.get("X-Request-ID").expect("correlation header present");
    assert_eq!(parts.headers.get("x-request-id"), Some(id));
    assert!(!id.to_str().unwrap().is_empty());
}

#[tokio::test]
async fn supplied_request_id_is_echoed() {
    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .header("X-Request-ID", "caller-chosen-id")
        .body(Body::empty())
        .unwrap();

    let (parts, _) = send(default_app(), request).await;
    assert_eq!(parts.headers.get("x-request-id").unwrap(), "caller-chosen-id");
}

#[tokio::test]
async fn wrong_auth_scheme_is_401_with_envelope() {
    let (parts, body) = send(
        default_app(),
        post_json("/v1/chat/completions", Some("Basic abc"), &chat_body()),
    )
    .await;

    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);
    assert_eq!(parts.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert!(parts.headers.get("x-request-id").is_some());
    assert_eq!(body["error"]["type"], "auth_error");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn missing_and_unknown_tokens_are_401() {
    let (parts, _) = send(default_app(), post_json("/v1/chat/completions", None, &chat_body())).await;
    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);

    let (parts, body) = send(
        default_app(),
        post_json("/v1/chat/completions", Some("Bearer wrong"), &chat_body()),
    )
    .await;
    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "auth_error");
}

#[tokio::test]
async fn custom_chat_unary_success() {
    let (parts, body) = send(
        default_app(),
        post_json("/v1/chat/completions", Some("Bearer test-key"), &chat_body()),
    )
    .await;

    assert_eq!(parts.status, StatusCode::OK);
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["object"], "chat.completion");
    assert!(body["created"].as_i64().unwrap() > 0);
    assert_eq!(body["model"], "m");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert!(body["usage"]["prompt_tokens"].as_u64().unwrap() == 0);
    assert!(parts.headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn unknown_extra_fields_are_accepted() {
    let mut body = chat_body();
    body["fancy_new_knob"] = json!({"level": 11});

    let (parts, _) = send(
        default_app(),
        post_json("/v1/chat/completions", Some("Bearer test-key"), &body),
    )
    .await;
    assert_eq!(parts.status, StatusCode::OK);
}

#[tokio::test]
async fn stream_on_non_streaming_provider_is_501() {
    let mut body = chat_body();
    body["stream"] = json!(true);

    let (parts, body) = send(
        default_app(),
        post_json("/cerebras/v1/chat/completions", Some("Bearer test-key"), &body),
    )
    .await;

    assert_eq!(parts.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["type"], "not_implemented");
}

#[tokio::test]
async fn missing_model_is_422() {
    let (parts, body) = send(
        default_app(),
        post_json("/v1/embeddings", Some("Bearer test-key"), &json!({"input": "hello"})),
    )
    .await;

    assert_eq!(parts.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn malformed_json_and_empty_messages_are_422() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer test-key")
        .body(Body::from("{not json"))
        .unwrap();
    let (parts, body) = send(default_app(), request).await;
    assert_eq!(parts.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");

    let (parts, _) = send(
        default_app(),
        post_json(
            "/v1/chat/completions",
            Some("Bearer test-key"),
            &json!({"model": "m", "messages": []}),
        ),
    )
    .await;
    assert_eq!(parts.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_namespace_is_404_with_envelope() {
    let (parts, body) = send(default_app(), get("/groq/v1/models", Some("Bearer test-key"))).await;

    assert_eq!(parts.status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "http_error");
    assert_eq!(body["error"]["details"]["status_code"], 404);
    assert!(parts.headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn custom_models_catalog() {
    let (parts, body) = send(default_app(), get("/v1/models", Some("Bearer test-key"))).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body["object"], "list");
    let data = body["data"].as_array().unwrap();
    assert!(!data.is_empty());
    assert!(data.iter().all(|model| model["object"] == "model" && model["owned_by"] == "custom"));
}

#[tokio::test]
async fn custom_embeddings_honor_dimensions() {
    let (parts, body) = send(
        default_app(),
        post_json(
            "/v1/embeddings",
            Some("Bearer test-key"),
            &json!({"model": "m", "input": ["one", "two"], "dimensions": 4}),
        ),
    )
    .await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["embedding"].as_array().unwrap().len(), 4);
    assert_eq!(body["data"][1]["index"], 1);
    assert_eq!(body["model"], "m");
    assert!(body["usage"]["prompt_tokens"].as_u64().is_some());
}

#[tokio::test]
async fn security_headers_are_on_by_default_and_toggleable() {
    let (parts, _) = send(default_app(), get("/healthz", None)).await;
    assert_eq!(parts.headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(parts.headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(parts.headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(parts.headers.get("permissions-policy").unwrap(), "()");

    let app = test_app(&[("ALLOWED_API_KEYS", "test-key"), ("ENABLE_SECURITY_HEADERS", "false")]);
    let (parts, _) = send(app, get("/healthz", None)).await;
    assert!(parts.headers.get("x-frame-options").is_none());
}

#[tokio::test]
async fn cors_preflight_allows_listed_origins_and_fails_closed() {
    let app = || {
        test_app(&[
            ("ALLOWED_API_KEYS", "test-key"),
            ("ENABLE_CORS", "true"),
            ("CORS_ALLOWED_ORIGINS", "http://allowed.example"),
        ])
    };

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/v1/models")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    };

    let (parts, _) = send(app(), preflight("http://allowed.example")).await;
    assert_eq!(
        parts.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://allowed.example"
    );

    let (parts, _) = send(app(), preflight("http://evil.example")).await;
    assert!(parts.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn cors_is_disabled_by_default() {
    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .header(header::ORIGIN, "http://anywhere.example")
        .body(Body::empty())
        .unwrap();

    let (parts, _) = send(default_app(), request).await;
    assert!(parts.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn require_auth_false_disables_the_gate() {
    let app = test_app(&[("REQUIRE_AUTH", "false")]);
    let (parts, _) = send(app, post_json("/v1/chat/completions", None, &chat_body())).await;
    assert_eq!(parts.status, StatusCode::OK);
}

#[tokio::test]
async fn dev_mode_accepts_any_well_formed_bearer() {
    let app = || test_app(&[("DEVELOPMENT_MODE", "true")]);

    let (parts, _) = send(
        app(),
        post_json("/v1/chat/completions", Some("Bearer any-token-at-all"), &chat_body()),
    )
    .await;
    assert_eq!(parts.status, StatusCode::OK);

    let (parts, _) = send(app(), post_json("/v1/chat/completions", Some("Basic abc"), &chat_body())).await;
    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn error_responses_echo_the_supplied_request_id() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "err-trace-1")
        .body(Body::from(chat_body().to_string()))
        .unwrap();

    let (parts, _) = send(default_app(), request).await;
    assert_eq!(parts.status, StatusCode::UNAUTHORIZED);
    assert_eq!(parts.headers.get("X-Request-ID").unwrap(), "err-trace-1");
}
