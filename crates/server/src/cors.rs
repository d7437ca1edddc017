use anyhow::Context;
use config::Settings;
use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build the CORS layer from the explicit allowlists. Everything is
/// list-based: origins, methods, and headers outside the configuration fail
/// closed, including preflight.
pub(crate) fn layer(settings: &Settings) -> anyhow::Result<CorsLayer> {
    let origins = settings
        .cors_allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin: {origin:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut methods = settings
        .cors_allowed_methods
        .iter()
        .map(|method| {
            Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid CORS method: {method:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Preflight needs OPTIONS even when the configuration omits it.
    if !methods.contains(&Method::OPTIONS) {
        methods.push(Method::OPTIONS);
    }

    let headers = settings
        .cors_allowed_headers
        .iter()
        .map(|header| {
            HeaderName::from_bytes(header.as_bytes())
                .with_context(|| format!("invalid CORS header name: {header:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
        .allow_credentials(settings.cors_allow_credentials))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_vars(&vars).unwrap()
    }

    #[test]
    fn explicit_allowlists_build() {
        let settings = settings(&[
            ("ALLOWED_API_KEYS", "k"),
            ("ENABLE_CORS", "true"),
            ("CORS_ALLOWED_ORIGINS", "http://example.com"),
        ]);
        assert!(layer(&settings).is_ok());
    }

    #[test]
    fn invalid_origin_fails_construction() {
        let settings = settings(&[
            ("ALLOWED_API_KEYS", "k"),
            ("CORS_ALLOWED_ORIGINS", "http://exa mple.com\u{7f}"),
        ]);
        assert!(layer(&settings).is_err());
    }
}
