//! MCP (Model Context Protocol) Server Implementation
//!
//! Stdio MCP server exposing management API tools, with every tool call
//! passing through the environment authorization middleware.

pub mod cancellation;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod tool_registry;
pub mod tools;

pub use cancellation::CancellationManager;
pub use error::McpError;
pub use handler::McpHandler;
pub use middleware::{AuthorizationError, AuthorizationLayer, AuthorizationService};
pub use protocol::*;
pub use server::McpStdioServer;
pub use tool_registry::ToolRegistry;
