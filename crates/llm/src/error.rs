use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Gateway errors. Each kind maps to exactly one HTTP status code and is
/// rendered as the standardized envelope; upstream internals never reach the
/// public payload.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Authentication failed. Always rendered with `WWW-Authenticate: Bearer`.
    #[error("{0}")]
    Auth(String),

    /// Request body failed schema validation.
    #[error("{0}")]
    Validation(String),

    /// Upstream transport, timeout, protocol, or malformed response.
    #[error("{0}")]
    Provider(String),

    /// Capability unavailable on this provider.
    #[error("{0} is not supported by this provider")]
    NotImplemented(&'static str),

    /// Unexpected failure. Details are logged where the error is created,
    /// never surfaced.
    #[error("An internal error occurred.")]
    Internal,
}

impl GatewayError {
    /// Normalize an upstream failure without leaking its internals.
    pub fn upstream() -> Self {
        Self::Provider("Upstream provider error".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth_error",
            Self::Validation(_) => "validation_error",
            Self::Provider(_) => "provider_error",
            Self::NotImplemented(_) => "not_implemented",
            Self::Internal => "internal_error",
        }
    }
}

/// The canonical error payload: `{"error":{"type","message","details"?}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    r#type: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                r#type: error_type.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl From<&GatewayError> for ErrorEnvelope {
    fn from(error: &GatewayError) -> Self {
        Self::new(error.error_type(), error.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            // Full upstream detail is logged where the error originates;
            // this records that a request surfaced it.
            log::warn!("request failed with {}: {self}", status.as_u16());
        }

        let envelope = ErrorEnvelope::from(&self);

        match &self {
            Self::Auth(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(envelope)).into_response()
            }
            _ => (status, Json(envelope)).into_response(),
        }
    }
}
