//! MCP Protocol Types
//!
//! JSON-RPC 2.0 and the subset of MCP message types envgate serves
//! (initialize, ping, tools/list, tools/call, notifications).

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Latest MCP protocol version this server speaks
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions accepted during negotiation, oldest first
pub const SUPPORTED_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl JsonRpcRequest {
    pub fn new(id: Option<JsonRpcId>, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, method: method.into(), params }
    }

    /// Notifications carry no id and never get a response
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.method.starts_with("notifications/")
    }

    pub fn is_tool_call(&self) -> bool {
        self.method == "tools/call"
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// MCP error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server-defined: the call was refused by the authorization middleware
    pub const AUTHORIZATION_FAILED: i32 = -32001;
    /// Server-defined: the call was cancelled by the client before it completed
    pub const REQUEST_CANCELLED: i32 = -32800;
}

/// MCP Initialize Request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    pub client_info: ClientInfo,
}

/// Client information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Server information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: Option<bool>,
}

/// Tool behavioral hints (MCP tool annotations)
///
/// `read_only_hint` is the one envgate acts on: it decides whether a call is
/// authorized as a READ or a WRITE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// MCP Tool Definition as advertised by tools/list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// MCP Tools List Response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// MCP Tool Call Parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// MCP Tool Call Result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }], is_error: None }
    }

    pub fn error_text(text: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: text.into() }], is_error: Some(true) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Parameters of a `notifications/cancelled` message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    pub request_id: JsonRpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A parsed request as handed from the transport to the service stack.
///
/// `cancellation` fires when the client sends `notifications/cancelled` for
/// this request or the server shuts down.
#[derive(Debug, Clone)]
pub struct McpRequest {
    pub request: JsonRpcRequest,
    pub cancellation: CancellationToken,
}

impl McpRequest {
    pub fn new(request: JsonRpcRequest) -> Self {
        Self { request, cancellation: CancellationToken::new() }
    }

    pub fn with_cancellation(request: JsonRpcRequest, cancellation: CancellationToken) -> Self {
        Self { request, cancellation }
    }

    pub fn id(&self) -> Option<&JsonRpcId> {
        self.request.id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_params_defaults_to_null() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).unwrap();
        assert_eq!(request.id, Some(JsonRpcId::Number(1)));
        assert!(request.params.is_null());
        assert!(!request.is_notification());
    }

    #[test]
    fn test_notification_detection() {
        let request: JsonRpcRequest = serde_json::from_value(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_string_and_numeric_ids() {
        let id: JsonRpcId = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(id, JsonRpcId::String("abc".to_string()));
        let id: JsonRpcId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id, JsonRpcId::Number(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_tool_annotations_use_camel_case() {
        let annotations = ToolAnnotations {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            ..Default::default()
        };
        let value = serde_json::to_value(&annotations).unwrap();
        assert_eq!(value, json!({"readOnlyHint": true, "destructiveHint": false}));
    }

    #[test]
    fn test_tool_serialization() {
        let tool = Tool {
            name: "get_environment".to_string(),
            description: Some("Get one environment".to_string()),
            input_schema: json!({"type": "object"}),
            annotations: None,
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"], json!({"type": "object"}));
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn test_tool_call_result_error_flag() {
        let value = serde_json::to_value(ToolCallResult::error_text("boom")).unwrap();
        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["content"][0]["type"], json!("text"));
    }

    #[test]
    fn test_cancelled_params() {
        let params: CancelledParams =
            serde_json::from_value(json!({"requestId": 9, "reason": "user abort"})).unwrap();
        assert_eq!(params.request_id, JsonRpcId::Number(9));
        assert_eq!(params.reason.as_deref(), Some("user abort"));
    }
}
