//! Operation types and per-tool production policies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a tool call reads or mutates its target environment.
///
/// Always derived from the tool definition, never taken from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Read,
    Write,
}

impl OperationType {
    pub fn from_read_only(read_only: bool) -> Self {
        if read_only {
            OperationType::Read
        } else {
            OperationType::Write
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Read => "READ",
            OperationType::Write => "WRITE",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Production overrides attached to a tool definition.
///
/// When `not_applicable` is set the tool has no single governed environment and
/// the two allow flags are ignored. The default policy denies both reads and
/// writes against PRODUCTION.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub allow_production_read: bool,
    pub allow_production_write: bool,
    pub not_applicable: bool,
}

impl ValidationPolicy {
    pub const fn not_applicable() -> Self {
        Self { allow_production_read: false, allow_production_write: false, not_applicable: true }
    }

    pub const fn allow_production_read() -> Self {
        Self { allow_production_read: true, allow_production_write: false, not_applicable: false }
    }

    pub const fn allow_production_write() -> Self {
        Self { allow_production_read: false, allow_production_write: true, not_applicable: false }
    }

    /// Whether `operation` may run against a PRODUCTION environment
    pub fn allows_production(&self, operation: OperationType) -> bool {
        match operation {
            OperationType::Read => self.allow_production_read,
            OperationType::Write => self.allow_production_write,
        }
    }

    /// Whether a call with `operation` can skip environment validation entirely
    pub fn skips_validation(&self, operation: OperationType) -> bool {
        self.not_applicable || self.allows_production(operation)
    }
}
