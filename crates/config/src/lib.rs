//! Gateway configuration.
//!
//! Settings are resolved from process environment variables once at startup
//! by the composition root and shared immutably from there. Nothing in this
//! crate reads the environment at module load; tests construct [`Settings`]
//! from an explicit variable map instead.

mod loader;

use std::{collections::HashMap, str::FromStr, time::Duration};

use secrecy::SecretString;

pub use loader::ConfigError;

/// Structured-log threshold accepted via `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            _ => Err(ConfigError::new(
                "LOG_LEVEL",
                "must be one of DEBUG, INFO, WARNING, ERROR",
            )),
        }
    }
}

/// Service configuration resolved from the environment.
///
/// Invariants enforced at construction:
/// - `request_timeout_s` is strictly positive;
/// - `log_level` is a member of the allowed set;
/// - when `require_auth` is on and `development_mode` is off, the bearer
///   allowlist must be non-empty.
#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,

    pub allowed_api_keys: Vec<String>,
    pub require_auth: bool,
    pub development_mode: bool,

    pub enable_security_headers: bool,
    pub enable_cors: bool,
    pub cors_allowed_origins: Vec<String>,
    pub cors_allowed_headers: Vec<String>,
    pub cors_allowed_methods: Vec<String>,
    pub cors_allow_credentials: bool,

    pub cerebras_api_key: Option<SecretString>,
    pub cerebras_base_url: Option<String>,
    pub ollama_host: Option<String>,

    pub request_timeout_s: f64,
    pub enable_enrichment: bool,
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build settings from an explicit variable map. Used by tests and by
    /// `from_env`; empty values are treated as missing, like the environment.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        loader::load(vars)
    }

    /// Outbound call timeout for the initial upstream request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_s)
    }

    /// True when the development-mode auth relaxation is in effect: any
    /// well-formed bearer token is accepted because no allowlist is set.
    pub fn dev_auth_relaxed(&self) -> bool {
        self.development_mode && self.require_auth && self.allowed_api_keys.is_empty()
    }
}
