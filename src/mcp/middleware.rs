//! Authorization middleware
//!
//! A tower layer installed ahead of the tool handlers. Every `tools/call` is
//! resolved against the [`ToolRegistry`]; when the tool's policy does not
//! exempt the call, the `environmentId` argument is extracted and checked by
//! the [`EnvironmentValidator`] before the inner service sees the request.
//! Any failure denies the call and the inner service is never invoked.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::{debug, field, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::UnknownToolPolicy;
use crate::domain::EnvironmentId;
use crate::mcp::error::McpError;
use crate::mcp::protocol::{JsonRpcResponse, McpRequest, ToolCallParams};
use crate::mcp::tool_registry::ToolRegistry;
use crate::mcp::tools::ENVIRONMENT_ID_FIELD;
use crate::observability::MetricsRecorder;
use crate::validation::{EnvironmentValidator, ValidationError};

/// Why the middleware refused a tool call
#[derive(Error, Debug)]
pub enum AuthorizationError {
    /// The environment identifier needed for validation is missing or unparseable
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AuthorizationError {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthorizationError::MalformedRequest(_) => "malformed_request",
            AuthorizationError::UnknownTool(_) => "unknown_tool",
            AuthorizationError::Validation(err) => err.reason(),
        }
    }
}

/// Shared, immutable state of the authorization check
struct Authorizer {
    registry: Arc<ToolRegistry>,
    validator: Arc<dyn EnvironmentValidator>,
    unknown_tools: UnknownToolPolicy,
    metrics: MetricsRecorder,
}

impl Authorizer {
    /// Authorize one tool call.
    ///
    /// Returns the parsed environment id, when there is one, so the caller can
    /// hand the handler the same id that was checked.
    async fn authorize(
        &self,
        request: &McpRequest,
    ) -> Result<Option<EnvironmentId>, AuthorizationError> {
        let params: ToolCallParams = serde_json::from_value(request.request.params.clone())
            .map_err(|e| {
                AuthorizationError::MalformedRequest(format!("invalid tools/call params: {}", e))
            })?;

        let Some(tool) = self.registry.get(&params.name) else {
            return match self.unknown_tools {
                UnknownToolPolicy::Deny => {
                    self.deny(&params.name, "unknown_tool");
                    Err(AuthorizationError::UnknownTool(params.name))
                }
                UnknownToolPolicy::PassThrough => {
                    warn!(tool_name = %params.name, "Unknown tool passed through without validation");
                    Ok(None)
                }
            };
        };

        let operation = tool.operation_type();
        Span::current().record("operation", operation.as_str());

        let policy = tool.effective_policy();
        if policy.skips_validation(operation) {
            debug!(tool_name = %tool.name, "Validation not required by tool policy");
            return Ok(extract_environment_id(params.arguments.as_ref()).ok());
        }

        let environment_id = extract_environment_id(params.arguments.as_ref()).inspect_err(|_| {
            self.deny(&tool.name, "malformed_request");
        })?;
        Span::current().record("environment_id", field::display(environment_id));

        self.validator
            .validate(&request.cancellation, environment_id, operation, &policy)
            .await
            .map_err(|e| {
                self.deny(&tool.name, e.reason());
                AuthorizationError::Validation(e)
            })?;

        debug!(tool_name = %tool.name, "Tool call authorized");
        Ok(Some(environment_id))
    }

    fn deny(&self, tool_name: &str, reason: &'static str) {
        self.metrics.record_denied(tool_name, reason);
        warn!(tool_name = %tool_name, reason, "Tool call denied");
    }
}

/// Pull `environmentId` out of arbitrary tool arguments.
///
/// Accepts the UUID as a string or as its 16 raw bytes. Anything else,
/// including an absent field, is a malformed request.
pub fn extract_environment_id(arguments: Option<&Value>) -> Result<EnvironmentId, AuthorizationError> {
    let arguments = arguments.and_then(Value::as_object).ok_or_else(|| {
        AuthorizationError::MalformedRequest(format!(
            "tool arguments must be an object containing '{}'",
            ENVIRONMENT_ID_FIELD
        ))
    })?;

    let raw = arguments.get(ENVIRONMENT_ID_FIELD).filter(|v| !v.is_null()).ok_or_else(|| {
        AuthorizationError::MalformedRequest(format!(
            "missing required argument '{}'",
            ENVIRONMENT_ID_FIELD
        ))
    })?;

    let invalid = |detail: String| {
        AuthorizationError::MalformedRequest(format!(
            "'{}' is not a valid environment id: {}",
            ENVIRONMENT_ID_FIELD, detail
        ))
    };

    match raw {
        Value::String(s) => EnvironmentId::parse(s).map_err(|e| invalid(e.to_string())),
        Value::Array(items) => {
            let bytes: Vec<u8> = items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<_>>()
                .ok_or_else(|| invalid("byte array must contain values 0-255".to_string()))?;
            Uuid::from_slice(&bytes).map(EnvironmentId::from_uuid).map_err(|e| invalid(e.to_string()))
        }
        other => Err(invalid(format!("unsupported JSON type ({})", json_type(other)))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Replace `environmentId` in the call arguments with its canonical form
pub fn canonicalize_environment_id(request: &mut McpRequest, environment_id: EnvironmentId) {
    if let Some(arguments) =
        request.request.params.get_mut("arguments").and_then(Value::as_object_mut)
    {
        arguments.insert(ENVIRONMENT_ID_FIELD.to_string(), Value::String(environment_id.to_string()));
    }
}

/// Tower layer adding environment authorization to an MCP service
#[derive(Clone)]
pub struct AuthorizationLayer {
    authorizer: Arc<Authorizer>,
}

impl AuthorizationLayer {
    pub fn new(
        registry: Arc<ToolRegistry>,
        validator: Arc<dyn EnvironmentValidator>,
        unknown_tools: UnknownToolPolicy,
    ) -> Self {
        Self {
            authorizer: Arc::new(Authorizer {
                registry,
                validator,
                unknown_tools,
                metrics: MetricsRecorder::new(),
            }),
        }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService { inner, authorizer: self.authorizer.clone() }
    }
}

/// Service wrapper that authorizes tool calls before forwarding them
#[derive(Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    authorizer: Arc<Authorizer>,
}

impl<S> Service<McpRequest> for AuthorizationService<S>
where
    S: Service<McpRequest, Response = JsonRpcResponse, Error = McpError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = JsonRpcResponse;
    type Error = McpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: McpRequest) -> Self::Future {
        let mut inner = self.inner.clone();

        if !request.request.is_tool_call() {
            return Box::pin(inner.call(request));
        }

        let authorizer = self.authorizer.clone();
        let tool_name = request.request.params.get("name").and_then(Value::as_str).unwrap_or("");
        let span = crate::tool_call_span!(tool_name, rpc_id = ?request.request.id);

        Box::pin(
            async move {
                let mut request = request;
                if let Some(environment_id) = authorizer.authorize(&request).await? {
                    canonicalize_environment_id(&mut request, environment_id);
                }
                inner.call(request).await
            }
            .instrument(span),
        )
    }
}
