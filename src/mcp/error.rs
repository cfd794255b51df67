//! MCP Error Types

use crate::mcp::middleware::AuthorizationError;
use crate::mcp::protocol::{error_codes, JsonRpcError};
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("authorization failed: {0}")]
    AuthorizationFailed(#[from] AuthorizationError),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::ParseError(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => {
                error_codes::METHOD_NOT_FOUND
            }
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::InternalError(_)
            | McpError::ToolExecution(_)
            | McpError::SerializationError(_) => error_codes::INTERNAL_ERROR,
            McpError::Cancelled
            | McpError::AuthorizationFailed(AuthorizationError::Validation(
                ValidationError::Cancelled,
            )) => error_codes::REQUEST_CANCELLED,
            McpError::AuthorizationFailed(_) => error_codes::AUTHORIZATION_FAILED,
        }
    }

    /// Convert to JsonRpcError
    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            McpError::AuthorizationFailed(err) => {
                Some(serde_json::json!({ "reason": err.reason() }))
            }
            _ => None,
        };
        JsonRpcError { code: self.error_code(), message: self.to_string(), data }
    }
}

/// Implement Into<JsonRpcError> for McpError
impl From<McpError> for JsonRpcError {
    fn from(error: McpError) -> Self {
        error.to_json_rpc_error()
    }
}
