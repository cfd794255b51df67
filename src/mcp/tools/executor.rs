//! Tool Executor
//!
//! Executes catalog tools as management API calls. Each tool maps to an HTTP
//! method and a path template; `{placeholder}` segments are filled from the
//! call arguments and the remaining arguments become the query string (GET,
//! DELETE) or the JSON body (POST, PUT, PATCH).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::definition::ToolDefinition;
use crate::client::StaticTokenClientFactory;
use crate::mcp::error::McpError;
use crate::mcp::protocol::ToolCallResult;

/// Static regex for path parameter extraction
static PATH_PARAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^}]+)\}").expect("Path parameter regex is valid at compile time")
});

/// Business logic behind one registered tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        arguments: Value,
        cancel: CancellationToken,
    ) -> Result<ToolCallResult, McpError>;
}

/// HTTP method and path template of a management API operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub method: Method,
    pub path: &'static str,
}

impl ApiEndpoint {
    pub fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }

    /// Names of the `{placeholder}` segments in the path
    pub fn path_params(&self) -> Vec<&str> {
        PATH_PARAM_REGEX
            .captures_iter(self.path)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
            .collect()
    }

    fn sends_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

/// A catalog entry: the tool's metadata plus the endpoint that implements it
#[derive(Debug, Clone)]
pub struct ApiTool {
    pub definition: Arc<ToolDefinition>,
    pub endpoint: ApiEndpoint,
}

impl ApiTool {
    pub fn new(definition: ToolDefinition, endpoint: ApiEndpoint) -> Self {
        Self { definition: Arc::new(definition), endpoint }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn handler(&self, clients: Arc<StaticTokenClientFactory>) -> ApiToolHandler {
        ApiToolHandler { tool_name: self.definition.name.clone(), endpoint: self.endpoint.clone(), clients }
    }
}

impl AsRef<ToolDefinition> for ApiTool {
    fn as_ref(&self) -> &ToolDefinition {
        &self.definition
    }
}

/// Executes one [`ApiTool`] against the management API
pub struct ApiToolHandler {
    tool_name: String,
    endpoint: ApiEndpoint,
    clients: Arc<StaticTokenClientFactory>,
}

#[async_trait]
impl ToolHandler for ApiToolHandler {
    async fn call(
        &self,
        arguments: Value,
        cancel: CancellationToken,
    ) -> Result<ToolCallResult, McpError> {
        let arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                return Err(McpError::InvalidParams(
                    "Arguments must be a JSON object".to_string(),
                ))
            }
        };

        let path = build_path(self.endpoint.path, &arguments)?;
        let rest = remaining_arguments(&self.endpoint, arguments);
        let client = self
            .clients
            .management_client()
            .map_err(|e| McpError::ToolExecution(e.to_string()))?;

        debug!(
            tool_name = %self.tool_name,
            method = %self.endpoint.method,
            path = %path,
            "Executing management API call"
        );

        let (query, body) = if self.endpoint.sends_body() {
            (Vec::new(), Some(Value::Object(rest)))
        } else {
            (to_query(&rest), None)
        };

        let send = client.send(self.endpoint.method.clone(), &path, &query, body.as_ref());
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(McpError::Cancelled),
            result = send => result,
        };
        let response = result.map_err(|e| {
            error!(error = %e, path = %path, "Management API request failed");
            McpError::ToolExecution(format!("HTTP request failed: {}", e))
        })?;

        let status = response.status;
        let text = format!(
            "HTTP {} {}\n\n{}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            response.body
        );

        if status.is_success() {
            Ok(ToolCallResult::text(text))
        } else {
            Ok(ToolCallResult::error_text(text))
        }
    }
}

/// Substitute every `{placeholder}` in `template` from `arguments`
pub fn build_path(template: &str, arguments: &Map<String, Value>) -> Result<String, McpError> {
    let mut path = template.to_string();

    for captures in PATH_PARAM_REGEX.captures_iter(template) {
        let param_name = &captures[1];
        let param_value = arguments.get(param_name).ok_or_else(|| {
            McpError::InvalidParams(format!("Missing required path parameter: {}", param_name))
        })?;

        let value_str = match param_value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(McpError::InvalidParams(format!(
                    "Path parameter '{}' must be a string or number",
                    param_name
                )));
            }
        };

        if value_str.is_empty() || value_str.contains(['/', '?', '#']) || value_str.contains("..") {
            return Err(McpError::InvalidParams(format!(
                "Path parameter '{}' is not a valid path segment",
                param_name
            )));
        }

        path = path.replace(&format!("{{{}}}", param_name), &value_str);
    }

    Ok(path)
}

fn remaining_arguments(endpoint: &ApiEndpoint, mut arguments: Map<String, Value>) -> Map<String, Value> {
    for param in endpoint.path_params() {
        arguments.remove(param);
    }
    arguments
}

fn to_query(arguments: &Map<String, Value>) -> Vec<(String, String)> {
    arguments
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| match value {
            Value::String(s) => (key.clone(), s.clone()),
            other => (key.clone(), other.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_build_path_with_multiple_params() {
        let path = build_path(
            "/environments/{environmentId}/applications/{applicationId}",
            &args(json!({"environmentId": "env-1", "applicationId": 42})),
        )
        .unwrap();
        assert_eq!(path, "/environments/env-1/applications/42");
    }

    #[test]
    fn test_build_path_missing_param() {
        let err = build_path("/environments/{environmentId}", &args(json!({}))).unwrap_err();
        assert!(err.to_string().contains("environmentId"));
    }

    #[test]
    fn test_build_path_rejects_traversal() {
        let err =
            build_path("/environments/{environmentId}", &args(json!({"environmentId": "../admin"})))
                .unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[test]
    fn test_remaining_arguments_drop_path_params() {
        let endpoint = ApiEndpoint::new(Method::PUT, "/environments/{environmentId}");
        let rest = remaining_arguments(
            &endpoint,
            args(json!({"environmentId": "e", "name": "Prod EU"})),
        );
        assert_eq!(Value::Object(rest), json!({"name": "Prod EU"}));
    }

    fn clients_for(server: &MockServer) -> Arc<StaticTokenClientFactory> {
        let config = ApiConfig {
            base_url: server.uri(),
            access_token: Some("token".to_string()),
            ..ApiConfig::default()
        };
        Arc::new(StaticTokenClientFactory::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_read_tool_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/environments/env-1/applications"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let tool = ApiTool::new(
            ToolDefinition::new("list_applications", "applications", true),
            ApiEndpoint::new(Method::GET, "/environments/{environmentId}/applications"),
        );
        let result = tool
            .handler(clients_for(&server))
            .call(json!({"environmentId": "env-1", "limit": 10}), CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_error.is_none());
    }

    #[tokio::test]
    async fn test_write_tool_sends_body_and_flags_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/environments/env-1"))
            .and(body_json(json!({"name": "renamed"})))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
            .expect(1)
            .mount(&server)
            .await;

        let tool = ApiTool::new(
            ToolDefinition::new("update_environment", "environments", false),
            ApiEndpoint::new(Method::PUT, "/environments/{environmentId}"),
        );
        let result = tool
            .handler(clients_for(&server))
            .call(json!({"environmentId": "env-1", "name": "renamed"}), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(10)))
            .mount(&server)
            .await;

        let tool = ApiTool::new(
            ToolDefinition::new("list_environments", "environments", true),
            ApiEndpoint::new(Method::GET, "/environments"),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = tool.handler(clients_for(&server)).call(Value::Null, cancel).await.unwrap_err();
        assert!(matches!(err, McpError::Cancelled));
    }
}
