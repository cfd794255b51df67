//! Environment domain types
//!
//! An environment is the tenant-scoped container every governed tool targets.
//! Its classification can be promoted from `SANDBOX` to `PRODUCTION` but never
//! demoted; the validation cache relies on that.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::EnvironmentId;

/// Environment classification as reported by the management API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentType {
    Sandbox,
    Production,
}

impl EnvironmentType {
    pub fn is_production(self) -> bool {
        matches!(self, EnvironmentType::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentType::Sandbox => "SANDBOX",
            EnvironmentType::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment record fetched from the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: EnvironmentType,
}

impl Environment {
    pub fn new(
        id: EnvironmentId,
        name: impl Into<String>,
        environment_type: EnvironmentType,
    ) -> Self {
        Self { id, name: name.into(), environment_type }
    }

    pub fn is_production(&self) -> bool {
        self.environment_type.is_production()
    }
}
