//! # envgate
//!
//! An MCP server that gates every tool call against a production-safety policy
//! before it reaches the management API.
//!
//! ## Architecture
//!
//! ```text
//! stdin → McpStdioServer → AuthorizationLayer → McpHandler → ManagementClient
//!                               ↓
//!                 ToolRegistry + EnvironmentValidator (PRODUCTION cache)
//! ```
//!
//! ## Core Components
//!
//! - **Tool filter**: decides at startup which catalog tools are registered
//! - **Tool registry**: name → definition index consulted on every call
//! - **Environment validator**: SANDBOX/PRODUCTION check with a cache that only
//!   ever holds PRODUCTION environments
//! - **Authorization middleware**: tower layer extracting `environmentId` and
//!   invoking the validator, failing closed
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use envgate::{startup::build_gateway, AppConfig, McpStdioServer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let gateway = build_gateway(&config)?;
//!     McpStdioServer::new(gateway.service).run().await
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mcp;
pub mod observability;
pub mod startup;
pub mod validation;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use mcp::{McpHandler, McpStdioServer};
pub use observability::init_observability;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
