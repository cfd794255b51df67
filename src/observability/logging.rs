//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! Logs always go to stderr: when envgate runs as an MCP stdio server, stdout
//! carries the JSON-RPC stream and must not be interleaved with log lines.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber once for the process.
///
/// `RUST_LOG` wins over the configured level when set. Calling this again is a
/// no-op, and an already-installed subscriber (for example from a test harness)
/// is left in place.
pub fn init_logging(config: &ObservabilityConfig) {
    LOGGING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

        let result = match config.log_format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}

/// Create a tracing span for a single tool call.
///
/// Every span gets a fresh `request_id`; `environment_id` and `operation` are
/// recorded later by the authorization middleware once they are known.
///
/// ```rust,ignore
/// let span = tool_call_span!("update_environment");
/// let span = tool_call_span!("update_environment", rpc_id = ?id);
/// ```
#[macro_export]
macro_rules! tool_call_span {
    ($tool:expr) => {
        tracing::info_span!(
            "tool_call",
            tool_name = %$tool,
            request_id = %uuid::Uuid::new_v4(),
            environment_id = tracing::field::Empty,
            operation = tracing::field::Empty
        )
    };
    ($tool:expr, $($field:tt)*) => {
        tracing::info_span!(
            "tool_call",
            tool_name = %$tool,
            request_id = %uuid::Uuid::new_v4(),
            environment_id = tracing::field::Empty,
            operation = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Log the resolved configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        api_base_url = %config.api.base_url,
        access_token_configured = config.api.access_token.is_some(),
        write_tools_enabled = config.tools.enable_write_tools,
        include_tools = ?config.tools.include_tools,
        exclude_tools = ?config.tools.exclude_tools,
        include_collections = ?config.tools.include_collections,
        exclude_collections = ?config.tools.exclude_collections,
        unknown_tools = ?config.authorization.unknown_tools,
        "envgate configuration"
    );
}
