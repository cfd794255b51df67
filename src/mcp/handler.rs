//! MCP Request Handler
//!
//! Routes JSON-RPC requests to the method handlers. Exposed as a
//! `tower::Service` so that middleware (authorization) can be layered in front
//! of it.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, error, instrument};

use crate::client::StaticTokenClientFactory;
use crate::mcp::error::McpError;
use crate::mcp::protocol::*;
use crate::mcp::tools::{ApiTool, ToolHandler};

/// Negotiate MCP protocol version
///
/// Finds the highest version we support that is <= client's version.
fn negotiate_version(client_version: &str) -> Result<String, McpError> {
    SUPPORTED_VERSIONS
        .iter()
        .rev()
        .find(|&&v| v <= client_version)
        .map(|v| v.to_string())
        .ok_or_else(|| {
            McpError::InvalidParams(format!(
                "Unsupported protocol version '{}'; supported: {}",
                client_version,
                SUPPORTED_VERSIONS.join(", ")
            ))
        })
}

struct RegisteredTool {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
}

struct HandlerState {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

/// Dispatches MCP methods; cheap to clone
#[derive(Clone)]
pub struct McpHandler {
    state: Arc<HandlerState>,
    instructions: Option<Arc<str>>,
}

impl McpHandler {
    /// Create a handler serving `tools` in the given order
    pub fn new(tools: Vec<(Tool, Arc<dyn ToolHandler>)>) -> Self {
        let tools: Vec<RegisteredTool> =
            tools.into_iter().map(|(tool, handler)| RegisteredTool { tool, handler }).collect();
        let by_name =
            tools.iter().enumerate().map(|(index, t)| (t.tool.name.clone(), index)).collect();

        Self { state: Arc::new(HandlerState { tools, by_name }), instructions: None }
    }

    /// Create a handler executing catalog tools against the management API
    pub fn from_api_tools(tools: &[ApiTool], clients: Arc<StaticTokenClientFactory>) -> Self {
        Self::new(
            tools
                .iter()
                .map(|tool| {
                    let handler: Arc<dyn ToolHandler> = Arc::new(tool.handler(clients.clone()));
                    (tool.definition.to_mcp_tool(), handler)
                })
                .collect(),
        )
    }

    /// Instructions returned to the client on initialize
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(Arc::from(instructions.into()));
        self
    }

    pub fn tool_count(&self) -> usize {
        self.state.tools.len()
    }

    /// Handle one request; errors are mapped to JSON-RPC errors by the transport
    pub async fn dispatch(&self, request: McpRequest) -> Result<JsonRpcResponse, McpError> {
        let McpRequest { request, cancellation } = request;
        let id = request.id.clone();

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params)?,
            "ping" => json!({}),
            "tools/list" => self.handle_tools_list()?,
            "tools/call" => self.handle_tools_call(request.params, cancellation).await?,
            method if method.starts_with("notifications/") => {
                debug!(method = %method, "Received notification");
                Value::Null
            }
            method => return Err(McpError::MethodNotFound(method.to_string())),
        };

        Ok(JsonRpcResponse::success(id, result))
    }

    fn handle_initialize(&self, params: Value) -> Result<Value, McpError> {
        let params: InitializeParams = serde_json::from_value(params).map_err(|e| {
            error!(error = %e, "Failed to parse initialize params");
            McpError::InvalidParams(format!("Failed to parse initialize params: {}", e))
        })?;

        let client_version = if params.protocol_version.is_empty() {
            SUPPORTED_VERSIONS[0]
        } else {
            params.protocol_version.as_str()
        };
        let negotiated_version = negotiate_version(client_version)?;

        debug!(
            client_name = %params.client_info.name,
            client_version = %client_version,
            negotiated_version = %negotiated_version,
            "Protocol version negotiated"
        );

        let result = InitializeResult {
            protocol_version: negotiated_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(false) }),
            },
            server_info: ServerInfo {
                name: crate::APP_NAME.to_string(),
                version: crate::VERSION.to_string(),
            },
            instructions: self.instructions.as_deref().map(str::to_string),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_tools_list(&self) -> Result<Value, McpError> {
        let tools: Vec<Tool> = self.state.tools.iter().map(|t| t.tool.clone()).collect();
        debug!(count = tools.len(), "Listing available tools");

        Ok(serde_json::to_value(ToolsListResult { tools, next_cursor: None })?)
    }

    #[instrument(skip(self, params, cancellation), name = "mcp_tools_call")]
    async fn handle_tools_call(
        &self,
        params: Value,
        cancellation: tokio_util::sync::CancellationToken,
    ) -> Result<Value, McpError> {
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| McpError::InvalidParams(format!("Invalid tools/call params: {}", e)))?;

        let index = *self
            .state
            .by_name
            .get(&params.name)
            .ok_or_else(|| McpError::ToolNotFound(params.name.clone()))?;
        let handler = self.state.tools[index].handler.clone();

        debug!(tool_name = %params.name, "Executing tool");
        let result = handler.call(params.arguments.unwrap_or(Value::Null), cancellation).await?;

        Ok(serde_json::to_value(result)?)
    }
}

impl Service<McpRequest> for McpHandler {
    type Response = JsonRpcResponse;
    type Error = McpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: McpRequest) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { handler.dispatch(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(
            &self,
            arguments: Value,
            _cancel: CancellationToken,
        ) -> Result<ToolCallResult, McpError> {
            Ok(ToolCallResult::text(arguments.to_string()))
        }
    }

    fn handler() -> McpHandler {
        let tool = Tool {
            name: "echo".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
            annotations: None,
        };
        let echo: Arc<dyn ToolHandler> = Arc::new(EchoTool);
        McpHandler::new(vec![(tool, echo)])
    }

    fn request(id: i64, method: &str, params: Value) -> McpRequest {
        McpRequest::new(JsonRpcRequest::new(Some(JsonRpcId::Number(id)), method, params))
    }

    #[test]
    fn test_negotiate_version() {
        assert_eq!(negotiate_version("2025-06-18").unwrap(), "2025-06-18");
        assert_eq!(negotiate_version("2025-04-01").unwrap(), "2025-03-26");
        assert_eq!(negotiate_version("2099-01-01").unwrap(), PROTOCOL_VERSION);
        assert!(negotiate_version("2020-01-01").is_err());
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = handler()
            .dispatch(request(
                1,
                "initialize",
                json!({"protocolVersion": "2025-06-18", "clientInfo": {"name": "test"}}),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], json!("2025-06-18"));
        assert_eq!(result["serverInfo"]["name"], json!(crate::APP_NAME));
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let handler = handler();
        let list = handler.dispatch(request(2, "tools/list", Value::Null)).await.unwrap();
        assert_eq!(list.result.unwrap()["tools"][0]["name"], json!("echo"));

        let call = handler
            .dispatch(request(3, "tools/call", json!({"name": "echo", "arguments": {"a": 1}})))
            .await
            .unwrap();
        assert_eq!(call.id, Some(JsonRpcId::Number(3)));
        assert_eq!(call.result.unwrap()["content"][0]["text"], json!("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let handler = handler();
        let err = handler
            .dispatch(request(4, "tools/call", json!({"name": "missing"})))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));

        let err = handler.dispatch(request(5, "resources/list", Value::Null)).await.unwrap_err();
        assert!(matches!(err, McpError::MethodNotFound(_)));
    }
}
