use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use config::Settings;
use http::header::AUTHORIZATION;
use llm::GatewayError;

const SCHEME_BEARER: &str = "Bearer";

/// Bearer-token gate applied to every provider route.
///
/// Failures surface as [`GatewayError::Auth`], which renders as 401 with the
/// standardized envelope and `WWW-Authenticate: Bearer`. Token values never
/// reach error messages or logs.
pub(crate) async fn require_bearer(
    State(settings): State<Arc<Settings>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let authorization = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_string()),
            Err(_) => return Err(GatewayError::Auth("Malformed Authorization header".into())),
        },
    };

    authorize(&settings, authorization.as_deref())?;
    Ok(next.run(request).await)
}

/// Decide whether a request may pass, given the raw Authorization header.
fn authorize(settings: &Settings, authorization: Option<&str>) -> Result<(), GatewayError> {
    if !settings.require_auth {
        return Ok(());
    }

    let token = parse_bearer_token(authorization)?;

    // Development relaxation: with no allowlist configured, any well-formed
    // bearer header passes. Surfaced loudly at startup.
    if settings.development_mode && settings.allowed_api_keys.is_empty() {
        log::debug!("development mode: accepting bearer token without an allowlist check");
        return Ok(());
    }

    if !settings.allowed_api_keys.iter().any(|key| key == token) {
        return Err(GatewayError::Auth("Invalid credentials".into()));
    }

    Ok(())
}

/// Extract the token from `Bearer <token>`. The scheme is case-insensitive;
/// the token is trimmed and must be non-empty.
fn parse_bearer_token(authorization: Option<&str>) -> Result<&str, GatewayError> {
    let Some(authorization) = authorization else {
        return Err(GatewayError::Auth("Missing Authorization header".into()));
    };

    let Some((scheme, token)) = authorization.split_once(' ') else {
        return Err(GatewayError::Auth("Malformed Authorization header".into()));
    };

    if !scheme.eq_ignore_ascii_case(SCHEME_BEARER) {
        return Err(GatewayError::Auth("Invalid auth scheme".into()));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(GatewayError::Auth("Empty bearer token".into()));
    }

    Ok(token)
}
