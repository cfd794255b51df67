//! Domain layer
//!
//! Pure domain entities with zero infrastructure dependencies.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with NewType pattern
//! - `environment`: Environment records and their SANDBOX/PRODUCTION classification
//! - `policy`: Operation types and per-tool production overrides

pub mod environment;
pub mod id;
pub mod policy;

pub use environment::{Environment, EnvironmentType};
pub use id::EnvironmentId;
pub use policy::{OperationType, ValidationPolicy};
