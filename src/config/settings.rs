//! # Configuration Settings
//!
//! Defines the configuration structure for envgate. Every value is resolved once
//! at startup; nothing here is re-read while requests are being served.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Management API configuration
    #[validate(nested)]
    pub api: ApiConfig,

    /// Startup tool filter configuration
    pub tools: ToolFilterConfig,

    /// Request authorization configuration
    pub authorization: AuthorizationConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.api.connect_timeout_seconds > self.api.timeout_seconds {
            return Err(Error::config(
                "Connect timeout cannot be longer than the request timeout",
            ));
        }

        if !self.api.base_url.starts_with("https://") && !self.api.base_url.starts_with("http://")
        {
            return Err(Error::config("API base URL must start with 'https://' or 'http://'"));
        }

        Ok(())
    }
}

/// Management API client configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct ApiConfig {
    /// Base URL of the management API, including any version prefix
    #[validate(url(message = "API base URL must be a valid URL"))]
    pub base_url: String,

    /// Bearer token for the management API (obtained by an external login flow)
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com/v1".to_string(),
            access_token: None,
            timeout_seconds: 30,
            connect_timeout_seconds: 5,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

impl ApiConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Include/exclude lists and the global write switch consumed by the tool filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFilterConfig {
    pub include_tools: BTreeSet<String>,
    pub exclude_tools: BTreeSet<String>,
    pub include_collections: BTreeSet<String>,
    pub exclude_collections: BTreeSet<String>,
    /// Register tools that mutate resources. Off by default.
    pub enable_write_tools: bool,
}

impl ToolFilterConfig {
    /// Build a filter config from the raw comma-separated lists
    pub fn from_comma_lists(
        include_tools: &str,
        exclude_tools: &str,
        include_collections: &str,
        exclude_collections: &str,
        enable_write_tools: bool,
    ) -> Self {
        Self {
            include_tools: parse_name_list(include_tools),
            exclude_tools: parse_name_list(exclude_tools),
            include_collections: parse_name_list(include_collections),
            exclude_collections: parse_name_list(exclude_collections),
            enable_write_tools,
        }
    }

    /// True when either include list narrows the tool set
    pub fn has_include_lists(&self) -> bool {
        !self.include_tools.is_empty() || !self.include_collections.is_empty()
    }
}

/// Split a comma-separated list into trimmed, non-empty names
pub fn parse_name_list(raw: &str) -> BTreeSet<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// What the authorization middleware does with a tool name it has no definition for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownToolPolicy {
    /// Reject the call before it reaches the handler
    #[default]
    Deny,
    /// Skip validation and let the inner handler decide
    PassThrough,
}

/// Request authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    pub unknown_tools: UnknownToolPolicy,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" | "plain" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::config(format!(
                "Unknown log format '{}', expected 'compact' or 'json'",
                other
            ))),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), log_format: LogFormat::Compact }
    }
}
