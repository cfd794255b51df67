//! Environment validation errors

use http::StatusCode;
use thiserror::Error;

use crate::domain::{EnvironmentId, OperationType};

/// Reasons an environment validation can refuse a tool call.
///
/// Every variant is terminal for the call; nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No authenticated lookup client could be obtained
    #[error("authentication unavailable: {0}")]
    AuthenticationUnavailable(String),

    /// The lookup failed: not found, forbidden, or a transport error
    #[error("environment does not exist or is not accessible: {message}")]
    ResourceInaccessible { id: EnvironmentId, status: Option<StatusCode>, message: String },

    /// The environment is PRODUCTION and the tool's policy does not allow the operation
    #[error(
        "{operation} operation denied on PRODUCTION environment '{name}' ({id}): tool policy does not allow it"
    )]
    ProductionDenied { id: EnvironmentId, name: String, operation: OperationType },

    /// The lookup succeeded but returned no record
    #[error("environment response is nil for {0}")]
    EmptyResponse(EnvironmentId),

    /// The caller cancelled the call while the lookup was in flight
    #[error("environment lookup cancelled")]
    Cancelled,
}

impl ValidationError {
    /// Short label used for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::AuthenticationUnavailable(_) => "authentication_unavailable",
            ValidationError::ResourceInaccessible { .. } => "inaccessible",
            ValidationError::ProductionDenied { .. } => "production_denied",
            ValidationError::EmptyResponse(_) => "empty_response",
            ValidationError::Cancelled => "cancelled",
        }
    }
}
