//! Gateway server library.
//!
//! Wires the middleware chain, the authentication gate, and the provider
//! routers into a serveable application. Reusable from the binary and from
//! integration tests; building the app has no side effects beyond client
//! construction, so tests can substitute settings freely.

mod auth;
mod correlation;
mod cors;
mod health;
mod logging;
mod redact;
mod security;

use std::{any::Any, net::SocketAddr, sync::Arc};

use anyhow::anyhow;
use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use config::Settings;
use http::StatusCode;
use llm::{ErrorEnvelope, GatewayError};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

/// Configuration for serving the gateway.
pub struct ServeConfig {
    /// The socket address the server binds to.
    pub listen_address: SocketAddr,
    /// The resolved process settings.
    pub settings: Arc<Settings>,
}

/// Start the gateway and serve until the listener fails.
pub async fn serve(ServeConfig { listen_address, settings }: ServeConfig) -> anyhow::Result<()> {
    let app = app(settings)?;

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("failed to bind to {listen_address}: {e}"))?;

    log::info!("gateway listening on http://{listen_address}");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("server failed: {e}"))?;

    Ok(())
}

/// Build the application router.
///
/// Ingress order: correlation ID assignment, access logging, panic
/// containment, then security headers and CORS when enabled, then the
/// authentication gate on provider routes only. `/healthz` and the 404
/// fallback stay unauthenticated.
pub fn app(settings: Arc<Settings>) -> anyhow::Result<Router> {
    if settings.dev_auth_relaxed() {
        log::warn!(
            "development-mode auth relaxation is active: any well-formed bearer token will be accepted"
        );
    }

    let provider_routes = llm::router(&settings)?
        .layer(middleware::from_fn_with_state(settings.clone(), auth::require_bearer));

    let mut app = Router::new()
        .route("/healthz", get(health::health))
        .merge(provider_routes)
        .fallback(not_found);

    if settings.enable_cors {
        app = app.layer(cors::layer(&settings)?);
    }
    if settings.enable_security_headers {
        app = app.layer(middleware::from_fn(security::apply_headers));
    }

    // The last layer added runs first on ingress; correlation must precede
    // logging so access records carry the request ID.
    Ok(app
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(logging::access_log))
        .layer(middleware::from_fn(correlation::propagate)))
}

/// Unknown routes, including unknown provider namespaces.
async fn not_found() -> axum::response::Response {
    let envelope = ErrorEnvelope::new("http_error", "Not Found")
        .with_details(serde_json::json!({"status_code": 404}));
    (StatusCode::NOT_FOUND, Json(envelope)).into_response()
}

/// Outermost containment for unclassified failures: log with detail, answer
/// with the opaque internal-error envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    log::error!("request handler panicked: {}", redact::redact(&detail));
    GatewayError::Internal.into_response()
}
