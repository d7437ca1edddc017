use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::GatewayError;

/// Post-deserialization validation over the known fields of a request body.
pub(crate) trait ValidateRequest {
    fn validate(&self) -> crate::Result<()>;
}

/// JSON extractor that renders every body failure — malformed JSON, schema
/// mismatch, or a known-field invariant — as a validation error (422) in the
/// standardized envelope instead of axum's default rejection.
pub(crate) struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + ValidateRequest + Send,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| GatewayError::Validation(rejection.body_text()))?;

        value.validate()?;
        Ok(Self(value))
    }
}
