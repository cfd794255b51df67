//! Environment lookup collaborator
//!
//! The validator never builds its own HTTP client. It asks a
//! [`LookupClientFactory`] for an authenticated [`EnvironmentLookup`] on every
//! cache miss, so token refresh stays the factory's concern.

use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Environment, EnvironmentId};

/// Outcome of a lookup that reached the management API
#[derive(Debug, Clone)]
pub struct LookupResponse {
    /// `None` only when the API answered successfully with an empty body
    pub environment: Option<Environment>,
    pub status: StatusCode,
}

/// A failed lookup, with the HTTP status when one was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LookupError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl LookupError {
    pub fn new(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

#[async_trait]
pub trait EnvironmentLookup: Send + Sync {
    async fn get_environment(&self, id: EnvironmentId) -> Result<LookupResponse, LookupError>;
}

/// Supplies authenticated lookup clients
#[async_trait]
pub trait LookupClientFactory: Send + Sync {
    async fn client(&self) -> crate::Result<Arc<dyn EnvironmentLookup>>;
}
