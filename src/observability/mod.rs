//! # Observability Infrastructure
//!
//! Structured logging and authorization metrics for envgate.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{describe_metrics, MetricsRecorder};

use crate::config::ObservabilityConfig;

/// Initialize all observability components
pub fn init_observability(config: &ObservabilityConfig) {
    init_logging(config);
    describe_metrics();

    ::tracing::info!(
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Observability initialized"
    );
}
