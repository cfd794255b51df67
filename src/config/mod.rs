//! # Configuration Management
//!
//! Configuration is read once at startup from `ENVGATE_*` environment variables
//! (optionally seeded from a `.env` file by the binary) and then overridden by
//! command line flags. The resolved values are immutable for the process lifetime.

pub mod settings;

pub use settings::{
    parse_name_list, ApiConfig, AppConfig, AuthorizationConfig, LogFormat, ObservabilityConfig,
    ToolFilterConfig, UnknownToolPolicy,
};

use crate::errors::{Error, Result};

pub const ENV_API_BASE_URL: &str = "ENVGATE_API_BASE_URL";
pub const ENV_ACCESS_TOKEN: &str = "ENVGATE_ACCESS_TOKEN";
pub const ENV_API_TIMEOUT: &str = "ENVGATE_API_TIMEOUT_SECONDS";
pub const ENV_INCLUDE_TOOLS: &str = "ENVGATE_INCLUDE_TOOLS";
pub const ENV_EXCLUDE_TOOLS: &str = "ENVGATE_EXCLUDE_TOOLS";
pub const ENV_INCLUDE_COLLECTIONS: &str = "ENVGATE_INCLUDE_TOOL_COLLECTIONS";
pub const ENV_EXCLUDE_COLLECTIONS: &str = "ENVGATE_EXCLUDE_TOOL_COLLECTIONS";
pub const ENV_ENABLE_WRITE_TOOLS: &str = "ENVGATE_ENABLE_WRITE_TOOLS";
pub const ENV_ALLOW_UNKNOWN_TOOLS: &str = "ENVGATE_ALLOW_UNKNOWN_TOOLS";
pub const ENV_LOG_LEVEL: &str = "ENVGATE_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ENVGATE_LOG_FORMAT";

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup (environment, test fixtures)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let timeout_seconds = match lookup(ENV_API_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("Invalid {}: {}", ENV_API_TIMEOUT, e)))?,
            None => defaults.api.timeout_seconds,
        };

        let api = ApiConfig {
            base_url: lookup(ENV_API_BASE_URL).unwrap_or(defaults.api.base_url),
            access_token: lookup(ENV_ACCESS_TOKEN).filter(|t| !t.trim().is_empty()),
            timeout_seconds,
            connect_timeout_seconds: defaults.api.connect_timeout_seconds.min(timeout_seconds),
        };

        let list = |key: &str| lookup(key).unwrap_or_default();
        let tools = ToolFilterConfig::from_comma_lists(
            &list(ENV_INCLUDE_TOOLS),
            &list(ENV_EXCLUDE_TOOLS),
            &list(ENV_INCLUDE_COLLECTIONS),
            &list(ENV_EXCLUDE_COLLECTIONS),
            parse_bool(ENV_ENABLE_WRITE_TOOLS, lookup(ENV_ENABLE_WRITE_TOOLS))?,
        );

        let unknown_tools = if parse_bool(ENV_ALLOW_UNKNOWN_TOOLS, lookup(ENV_ALLOW_UNKNOWN_TOOLS))? {
            UnknownToolPolicy::PassThrough
        } else {
            UnknownToolPolicy::Deny
        };

        let observability = ObservabilityConfig {
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or(defaults.observability.log_level),
            log_format: match lookup(ENV_LOG_FORMAT) {
                Some(raw) => raw.parse()?,
                None => defaults.observability.log_format,
            },
        };

        Ok(Self {
            api,
            tools,
            authorization: AuthorizationConfig { unknown_tools },
            observability,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("Invalid boolean for {}: '{}'", key, other))),
    }
}
