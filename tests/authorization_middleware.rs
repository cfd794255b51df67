//! Authorization middleware integration tests
//!
//! Drives the tower stack the way the stdio transport does: an
//! `AuthorizationLayer` in front of a counting inner service, backed by the
//! real caching validator and an in-memory environment lookup.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::{service_fn, ServiceBuilder, ServiceExt};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use envgate::config::{AppConfig, ToolFilterConfig, UnknownToolPolicy};
use envgate::domain::{Environment, EnvironmentId, EnvironmentType};
use envgate::mcp::protocol::*;
use envgate::mcp::tools::catalog;
use envgate::mcp::{AuthorizationError, AuthorizationLayer, McpError, ToolRegistry};
use envgate::startup::build_gateway;
use envgate::validation::{
    CachingEnvironmentValidator, EnvironmentLookup, LookupClientFactory, LookupError,
    LookupResponse, ValidationError,
};

// -----------------------------------------------------------------------------
// Test Helpers
// -----------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryLookup {
    environments: Mutex<HashMap<EnvironmentId, Environment>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl InMemoryLookup {
    fn insert(&self, environment_type: EnvironmentType) -> EnvironmentId {
        let id = EnvironmentId::from_uuid(Uuid::new_v4());
        let environment = Environment::new(id, format!("env-{}", environment_type), environment_type);
        self.environments.lock().unwrap().insert(id, environment);
        id
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentLookup for InMemoryLookup {
    async fn get_environment(&self, id: EnvironmentId) -> Result<LookupResponse, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.environments.lock().unwrap().get(&id).cloned() {
            Some(environment) => {
                Ok(LookupResponse { environment: Some(environment), status: http::StatusCode::OK })
            }
            None => Err(LookupError::new(Some(http::StatusCode::NOT_FOUND), "HTTP 404: not found")),
        }
    }
}

struct InMemoryFactory(Arc<InMemoryLookup>);

#[async_trait]
impl LookupClientFactory for InMemoryFactory {
    async fn client(&self) -> envgate::Result<Arc<dyn EnvironmentLookup>> {
        let client: Arc<dyn EnvironmentLookup> = self.0.clone();
        Ok(client)
    }
}

struct Harness {
    lookup: Arc<InMemoryLookup>,
    inner_calls: Arc<AtomicUsize>,
    layer: AuthorizationLayer,
}

impl Harness {
    fn new(unknown_tools: UnknownToolPolicy) -> Self {
        Self::with_lookup(InMemoryLookup::default(), unknown_tools)
    }

    fn with_lookup(lookup: InMemoryLookup, unknown_tools: UnknownToolPolicy) -> Self {
        let lookup = Arc::new(lookup);
        let registry = Arc::new(
            ToolRegistry::new(catalog().into_iter().map(|tool| tool.definition)).unwrap(),
        );
        let validator =
            Arc::new(CachingEnvironmentValidator::new(Arc::new(InMemoryFactory(lookup.clone()))));

        Self {
            lookup,
            inner_calls: Arc::new(AtomicUsize::new(0)),
            layer: AuthorizationLayer::new(registry, validator, unknown_tools),
        }
    }

    async fn call(&self, request: McpRequest) -> Result<JsonRpcResponse, McpError> {
        let inner_calls = self.inner_calls.clone();
        let inner = service_fn(move |request: McpRequest| {
            let inner_calls = inner_calls.clone();
            async move {
                inner_calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, McpError>(JsonRpcResponse::success(
                    request.request.id,
                    json!({"handled": request.request.method}),
                ))
            }
        });

        ServiceBuilder::new().layer(self.layer.clone()).service(inner).oneshot(request).await
    }

    fn inner_calls(&self) -> usize {
        self.inner_calls.load(Ordering::SeqCst)
    }
}

fn tool_call(name: &str, arguments: Value) -> McpRequest {
    McpRequest::new(JsonRpcRequest::new(
        Some(JsonRpcId::Number(1)),
        "tools/call",
        json!({"name": name, "arguments": arguments}),
    ))
}

// -----------------------------------------------------------------------------
// Validation Scenarios
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_production_write_is_denied_before_the_handler() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Production);

    let err = harness
        .call(tool_call("update_environment", json!({"environmentId": id.to_string()})))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("authorization failed"));
    assert!(message.contains("PRODUCTION"));
    assert!(message.contains(&id.to_string()));
    assert_eq!(err.error_code(), error_codes::AUTHORIZATION_FAILED);
    assert!(matches!(
        err,
        McpError::AuthorizationFailed(AuthorizationError::Validation(
            ValidationError::ProductionDenied { .. }
        ))
    ));
    assert_eq!(harness.inner_calls(), 0);
}

#[tokio::test]
async fn test_sandbox_write_reaches_the_handler() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Sandbox);

    let response = harness
        .call(tool_call(
            "create_application",
            json!({"environmentId": id.to_string(), "name": "billing"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.result, Some(json!({"handled": "tools/call"})));
    assert_eq!(harness.inner_calls(), 1);
}

#[tokio::test]
async fn test_missing_environment_id_is_malformed_and_never_dispatched() {
    let harness = Harness::new(UnknownToolPolicy::Deny);

    let err = harness.call(tool_call("delete_application", json!({"applicationId": "a"}))).await.unwrap_err();

    assert!(matches!(err, McpError::AuthorizationFailed(AuthorizationError::MalformedRequest(_))));
    assert!(err.to_string().contains("malformed request"));
    assert_eq!(harness.inner_calls(), 0);
    assert_eq!(harness.lookup.calls(), 0);
}

#[tokio::test]
async fn test_unparseable_environment_id_is_malformed() {
    let harness = Harness::new(UnknownToolPolicy::Deny);

    let err = harness
        .call(tool_call("update_environment", json!({"environmentId": "prod-eu-1"})))
        .await
        .unwrap_err();

    assert!(matches!(err, McpError::AuthorizationFailed(AuthorizationError::MalformedRequest(_))));
    assert_eq!(harness.inner_calls(), 0);
}

#[tokio::test]
async fn test_unknown_environment_is_denied() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = EnvironmentId::from_uuid(Uuid::new_v4());

    let err = harness
        .call(tool_call("update_environment", json!({"environmentId": id.to_string()})))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("does not exist or is not accessible"));
    assert_eq!(harness.inner_calls(), 0);
}

#[tokio::test]
async fn test_byte_array_environment_id_is_accepted() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Sandbox);
    let bytes: Vec<Value> = id.as_uuid().as_bytes().iter().map(|b| json!(b)).collect();

    harness
        .call(tool_call("update_environment", json!({"environmentId": bytes})))
        .await
        .unwrap();

    assert_eq!(harness.inner_calls(), 1);
}

// -----------------------------------------------------------------------------
// Policy Exemptions
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_production_reads_skip_lookup() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Production);

    for name in ["get_environment", "list_applications", "list_populations"] {
        harness.call(tool_call(name, json!({"environmentId": id.to_string()}))).await.unwrap();
    }

    assert_eq!(harness.inner_calls(), 3);
    assert_eq!(harness.lookup.calls(), 0);
}

#[tokio::test]
async fn test_not_applicable_tools_need_no_environment() {
    let harness = Harness::new(UnknownToolPolicy::Deny);

    harness.call(tool_call("list_environments", json!({}))).await.unwrap();
    harness.call(tool_call("create_environment", json!({"name": "staging"}))).await.unwrap();

    assert_eq!(harness.inner_calls(), 2);
    assert_eq!(harness.lookup.calls(), 0);
}

#[tokio::test]
async fn test_non_tool_requests_pass_through() {
    let harness = Harness::new(UnknownToolPolicy::Deny);

    for method in ["initialize", "tools/list", "ping"] {
        let request = McpRequest::new(JsonRpcRequest::new(Some(JsonRpcId::Number(2)), method, json!({})));
        let response = harness.call(request).await.unwrap();
        assert_eq!(response.result, Some(json!({"handled": method})));
    }

    assert_eq!(harness.inner_calls(), 3);
}

// -----------------------------------------------------------------------------
// Unknown Tools
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_tool_denied_by_default() {
    let harness = Harness::new(UnknownToolPolicy::Deny);

    let err = harness.call(tool_call("drop_everything", json!({}))).await.unwrap_err();

    assert!(matches!(err, McpError::AuthorizationFailed(AuthorizationError::UnknownTool(ref name)) if name == "drop_everything"));
    assert_eq!(harness.inner_calls(), 0);
}

#[tokio::test]
async fn test_unknown_tool_passes_through_when_allowed() {
    let harness = Harness::new(UnknownToolPolicy::PassThrough);

    harness.call(tool_call("drop_everything", json!({}))).await.unwrap();

    assert_eq!(harness.inner_calls(), 1);
    assert_eq!(harness.lookup.calls(), 0);
}

// -----------------------------------------------------------------------------
// Cache Behavior Through The Stack
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_production_lookups_are_cached_across_calls() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Production);

    for _ in 0..3 {
        let err = harness
            .call(tool_call("update_environment", json!({"environmentId": id.to_string()})))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), error_codes::AUTHORIZATION_FAILED);
    }

    assert_eq!(harness.lookup.calls(), 1);
}

#[tokio::test]
async fn test_sandbox_lookups_are_repeated() {
    let harness = Harness::new(UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Sandbox);

    for _ in 0..3 {
        harness
            .call(tool_call("update_environment", json!({"environmentId": id.to_string()})))
            .await
            .unwrap();
    }

    assert_eq!(harness.lookup.calls(), 3);
    assert_eq!(harness.inner_calls(), 3);
}

#[tokio::test]
async fn test_concurrent_calls_share_the_stack() {
    let harness = Arc::new(Harness::new(UnknownToolPolicy::Deny));
    let sandbox = harness.lookup.insert(EnvironmentType::Sandbox);
    let production = harness.lookup.insert(EnvironmentType::Production);

    let mut tasks = Vec::new();
    for i in 0..20 {
        let harness = harness.clone();
        let id = if i % 2 == 0 { sandbox } else { production };
        tasks.push(tokio::spawn(async move {
            harness
                .call(tool_call("update_environment", json!({"environmentId": id.to_string()})))
                .await
                .is_ok()
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 10);
    assert_eq!(harness.inner_calls(), 10);
}

#[tokio::test]
async fn test_cancelled_call_returns_cancellation_error() {
    let lookup = InMemoryLookup { delay: Some(Duration::from_secs(30)), ..Default::default() };
    let harness = Harness::with_lookup(lookup, UnknownToolPolicy::Deny);
    let id = harness.lookup.insert(EnvironmentType::Sandbox);

    let cancel = CancellationToken::new();
    let request = McpRequest::with_cancellation(
        JsonRpcRequest::new(
            Some(JsonRpcId::Number(9)),
            "tools/call",
            json!({"name": "update_environment", "arguments": {"environmentId": id.to_string()}}),
        ),
        cancel.clone(),
    );

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), harness.call(request))
        .await
        .expect("cancellation must not hang")
        .unwrap_err();
    trigger.await.unwrap();

    assert_eq!(err.error_code(), error_codes::REQUEST_CANCELLED);
    assert_eq!(harness.inner_calls(), 0);
}

// -----------------------------------------------------------------------------
// End To End Against A Mock Management API
// -----------------------------------------------------------------------------

fn gateway_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig {
        tools: ToolFilterConfig { enable_write_tools: true, ..Default::default() },
        ..Default::default()
    };
    config.api.base_url = server.uri();
    config.api.access_token = Some("test-token".to_string());
    config
}

fn environment_body(id: EnvironmentId, environment_type: &str) -> Value {
    json!({"id": id.to_string(), "name": "payments", "type": environment_type})
}

#[tokio::test]
async fn test_gateway_updates_sandbox_environment() {
    let server = MockServer::start().await;
    let id = EnvironmentId::from_uuid(Uuid::new_v4());
    let env_path = format!("/environments/{}", id);

    Mock::given(method("GET"))
        .and(path(env_path.clone()))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(environment_body(id, "SANDBOX")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(env_path))
        .and(body_json(json!({"name": "payments-v2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": true})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = build_gateway(&gateway_config(&server)).unwrap();
    let response = gateway
        .service
        .oneshot(tool_call(
            "update_environment",
            json!({"environmentId": id.to_string(), "name": "payments-v2"}),
        ))
        .await
        .unwrap();

    let result: ToolCallResult = serde_json::from_value(response.result.unwrap()).unwrap();
    assert_eq!(result.is_error, None);
    let ContentBlock::Text { text } = &result.content[0];
    assert!(text.starts_with("HTTP 200"));
    assert!(!gateway.validator.is_cached(&id));
}

#[tokio::test]
async fn test_gateway_blocks_production_update() {
    let server = MockServer::start().await;
    let id = EnvironmentId::from_uuid(Uuid::new_v4());
    let env_path = format!("/environments/{}", id);

    Mock::given(method("GET"))
        .and(path(env_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(environment_body(id, "PRODUCTION")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(env_path))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = build_gateway(&gateway_config(&server)).unwrap();
    for _ in 0..2 {
        let err = gateway
            .service
            .clone()
            .oneshot(tool_call("update_environment", json!({"environmentId": id.to_string()})))
            .await
            .unwrap_err();

        let rpc_error = err.to_json_rpc_error();
        assert_eq!(rpc_error.code, error_codes::AUTHORIZATION_FAILED);
        assert!(rpc_error.message.contains("payments"));
    }

    assert!(gateway.validator.is_cached(&id));
}

#[tokio::test]
async fn test_gateway_without_token_denies_governed_calls() {
    let server = MockServer::start().await;
    let mut config = gateway_config(&server);
    config.api.access_token = None;

    let gateway = build_gateway(&config).unwrap();
    let id = EnvironmentId::from_uuid(Uuid::new_v4());
    let err = gateway
        .service
        .oneshot(tool_call("update_environment", json!({"environmentId": id.to_string()})))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        McpError::AuthorizationFailed(AuthorizationError::Validation(
            ValidationError::AuthenticationUnavailable(_)
        ))
    ));
}

#[tokio::test]
async fn test_gateway_executes_the_canonical_environment_id() {
    let server = MockServer::start().await;
    let id = EnvironmentId::from_uuid(Uuid::new_v4());
    let env_path = format!("/environments/{}", id);

    Mock::given(method("GET"))
        .and(path(env_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(environment_body(id, "SANDBOX")))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(env_path))
        .and(body_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": true})))
        .expect(3)
        .mount(&server)
        .await;

    let bytes: Vec<Value> = id.as_uuid().as_bytes().iter().map(|b| json!(b)).collect();
    let forms = [json!(bytes), json!(format!("  {}  ", id)), json!(format!("urn:uuid:{}", id))];

    let gateway = build_gateway(&gateway_config(&server)).unwrap();
    for form in forms {
        let response = gateway
            .service
            .clone()
            .oneshot(tool_call("update_environment", json!({"environmentId": form, "name": "renamed"})))
            .await
            .unwrap();

        let result: ToolCallResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.is_error, None, "{form}");
    }
}
