//! MCP Tools Module
//!
//! Tool metadata, the static catalog, the startup filter, and the executor that
//! turns a tool call into a management API request.

pub mod catalog;
pub mod definition;
pub mod executor;
pub mod filter;

pub use catalog::{catalog, ENVIRONMENT_ID_FIELD};
pub use definition::ToolDefinition;
pub use executor::{ApiEndpoint, ApiTool, ApiToolHandler, ToolHandler};
pub use filter::{ExclusionReason, FilterDecision, ToolFilter};
