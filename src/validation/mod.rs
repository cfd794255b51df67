//! # Environment Validation
//!
//! Per-call safety decision for tools that target an environment:
//!
//! - [`lookup`]: the authenticated lookup collaborator and its factory
//! - [`environment`]: the validator trait and its caching implementation
//! - [`error`]: why a validation refused a call

pub mod environment;
pub mod error;
pub mod lookup;

pub use environment::{check_policy, CachingEnvironmentValidator, EnvironmentValidator};
pub use error::ValidationError;
pub use lookup::{EnvironmentLookup, LookupClientFactory, LookupError, LookupResponse};
