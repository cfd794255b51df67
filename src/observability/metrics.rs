//! # Metrics Collection
//!
//! Counters for the authorization path. The library only records; installing an
//! exporter is left to the embedding process. Without one every call is a no-op.

use metrics::{counter, describe_counter, Unit};

pub const VALIDATION_CACHE_HITS: &str = "envgate_validation_cache_hits_total";
pub const VALIDATION_CACHE_MISSES: &str = "envgate_validation_cache_misses_total";
pub const ENVIRONMENT_LOOKUPS: &str = "envgate_environment_lookups_total";
pub const AUTHORIZATION_DENIED: &str = "envgate_authorization_denied_total";
pub const TOOLS_FILTERED: &str = "envgate_tools_filtered_total";

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        VALIDATION_CACHE_HITS,
        Unit::Count,
        "Validations answered from the production environment cache"
    );
    describe_counter!(
        VALIDATION_CACHE_MISSES,
        Unit::Count,
        "Validations that required an environment lookup"
    );
    describe_counter!(
        ENVIRONMENT_LOOKUPS,
        Unit::Count,
        "Environment lookups sent to the management API, by outcome"
    );
    describe_counter!(
        AUTHORIZATION_DENIED,
        Unit::Count,
        "Tool calls denied by the authorization middleware, by reason"
    );
    describe_counter!(TOOLS_FILTERED, Unit::Count, "Tools excluded at startup, by reason");
}

/// Stateless handle for recording authorization metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn new() -> Self {
        Self
    }

    pub fn record_cache_hit(&self) {
        counter!(VALIDATION_CACHE_HITS).increment(1);
    }

    pub fn record_cache_miss(&self) {
        counter!(VALIDATION_CACHE_MISSES).increment(1);
    }

    /// Record an environment lookup outcome (`ok`, `error`, `cancelled`, `empty`)
    pub fn record_lookup(&self, outcome: &'static str) {
        counter!(ENVIRONMENT_LOOKUPS, "outcome" => outcome).increment(1);
    }

    /// Record a denied tool call
    pub fn record_denied(&self, tool_name: &str, reason: &'static str) {
        let labels = [("tool", tool_name.to_string()), ("reason", reason.to_string())];
        counter!(AUTHORIZATION_DENIED, &labels).increment(1);
    }

    /// Record a tool excluded by the startup filter
    pub fn record_filtered(&self, reason: &'static str) {
        counter!(TOOLS_FILTERED, "reason" => reason).increment(1);
    }
}
