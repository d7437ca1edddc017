//! Environment parsing for [`Settings`](crate::Settings).

use std::collections::HashMap;

use secrecy::SecretString;

use crate::{LogLevel, Settings};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REQUEST_TIMEOUT_S: f64 = 30.0;

/// A configuration value failed validation. Fatal at startup: no partial
/// configuration is usable.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub(crate) fn load(vars: &HashMap<String, String>) -> Result<Settings, ConfigError> {
    let settings = Settings {
        host: get(vars, "SERVICE_HOST")
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_port(get(vars, "SERVICE_PORT"))?,
        log_level: match get(vars, "LOG_LEVEL") {
            Some(raw) => raw.parse()?,
            None => LogLevel::Info,
        },

        allowed_api_keys: get(vars, "ALLOWED_API_KEYS").map(parse_key_list).unwrap_or_default(),
        require_auth: parse_bool("REQUIRE_AUTH", get(vars, "REQUIRE_AUTH"), true)?,
        development_mode: parse_bool("DEVELOPMENT_MODE", get(vars, "DEVELOPMENT_MODE"), false)?,

        enable_security_headers: parse_bool(
            "ENABLE_SECURITY_HEADERS",
            get(vars, "ENABLE_SECURITY_HEADERS"),
            true,
        )?,
        enable_cors: parse_bool("ENABLE_CORS", get(vars, "ENABLE_CORS"), false)?,
        cors_allowed_origins: get(vars, "CORS_ALLOWED_ORIGINS").map(parse_key_list).unwrap_or_default(),
        cors_allowed_headers: get(vars, "CORS_ALLOWED_HEADERS")
            .map(parse_key_list)
            .unwrap_or_else(|| vec!["Authorization".to_string(), "Content-Type".to_string()]),
        cors_allowed_methods: get(vars, "CORS_ALLOWED_METHODS")
            .map(parse_key_list)
            .unwrap_or_else(|| vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]),
        cors_allow_credentials: parse_bool(
            "CORS_ALLOW_CREDENTIALS",
            get(vars, "CORS_ALLOW_CREDENTIALS"),
            false,
        )?,

        cerebras_api_key: get(vars, "CEREBRAS_API_KEY").map(|s| SecretString::from(s.to_string())),
        cerebras_base_url: get(vars, "CEREBRAS_BASE_URL").map(normalize_base_url),
        ollama_host: get(vars, "OLLAMA_HOST").map(normalize_base_url),

        request_timeout_s: parse_timeout(get(vars, "REQUEST_TIMEOUT_S"))?,
        enable_enrichment: parse_bool("ENABLE_ENRICHMENT", get(vars, "ENABLE_ENRICHMENT"), false)?,
    };

    // Cross-field invariant, checked after all fields resolve so the final
    // REQUIRE_AUTH and DEVELOPMENT_MODE values are in effect.
    if settings.require_auth && !settings.development_mode && settings.allowed_api_keys.is_empty() {
        return Err(ConfigError::new(
            "ALLOWED_API_KEYS",
            "must not be empty when REQUIRE_AUTH=true and DEVELOPMENT_MODE=false",
        ));
    }

    Ok(settings)
}

/// Empty and whitespace-only values are treated as missing, matching how the
/// environment behaves with `VAR=` assignments.
fn get<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// Accept `true/1/yes/y` and `false/0/no/n`, case-insensitively.
fn parse_bool(field: &'static str, raw: Option<&str>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else { return Ok(default) };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(ConfigError::new(field, format!("not a boolean: {other:?}"))),
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    let Some(raw) = raw else { return Ok(DEFAULT_PORT) };
    let port: u16 = raw
        .parse()
        .map_err(|_| ConfigError::new("SERVICE_PORT", format!("not a port number: {raw:?}")))?;
    if port == 0 {
        return Err(ConfigError::new("SERVICE_PORT", "must be between 1 and 65535"));
    }
    Ok(port)
}

fn parse_timeout(raw: Option<&str>) -> Result<f64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_REQUEST_TIMEOUT_S);
    };
    let timeout: f64 = raw
        .parse()
        .map_err(|_| ConfigError::new("REQUEST_TIMEOUT_S", format!("not a number: {raw:?}")))?;
    if !timeout.is_finite() || timeout <= 0.0 {
        return Err(ConfigError::new("REQUEST_TIMEOUT_S", "must be strictly positive"));
    }
    Ok(timeout)
}

/// Parse a list value given either as a JSON array or as a comma-separated
/// string. Entries are trimmed and empties dropped in both forms; a value
/// that looks like JSON but fails to parse falls back to CSV.
fn parse_key_list(raw: &str) -> Vec<String> {
    let s = raw.trim();

    if s.starts_with('[') && s.ends_with(']') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(s) {
            return items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}
