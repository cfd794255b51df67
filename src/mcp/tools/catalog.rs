//! Static tool catalog
//!
//! Every tool envgate knows about, grouped into collections. The startup
//! filter picks the subset that gets registered.

use reqwest::Method;
use serde_json::{json, Value};

use super::definition::ToolDefinition;
use super::executor::{ApiEndpoint, ApiTool};
use crate::domain::ValidationPolicy;

pub const ENVIRONMENTS: &str = "environments";
pub const APPLICATIONS: &str = "applications";
pub const POPULATIONS: &str = "populations";

/// Argument that names the governed environment
pub const ENVIRONMENT_ID_FIELD: &str = "environmentId";

/// The full tool catalog, in a stable order
pub fn catalog() -> Vec<ApiTool> {
    let mut tools = environment_tools();
    tools.extend(application_tools());
    tools.extend(population_tools());
    tools
}

fn environment_id_property() -> Value {
    json!({
        "type": "string",
        "format": "uuid",
        "description": "ID of the target environment"
    })
}

fn environment_tools() -> Vec<ApiTool> {
    vec![
        ApiTool::new(
            ToolDefinition::new("list_environments", ENVIRONMENTS, true)
                .with_policy(ValidationPolicy::not_applicable())
                .with_description("List the environments visible to the current session, with their names and SANDBOX/PRODUCTION classification.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 100},
                        "cursor": {"type": "string", "description": "Pagination cursor from a previous call"}
                    }
                })),
            ApiEndpoint::new(Method::GET, "/environments"),
        ),
        ApiTool::new(
            ToolDefinition::new("get_environment", ENVIRONMENTS, true)
                .with_policy(ValidationPolicy::allow_production_read())
                .with_description("Get one environment by ID.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {"environmentId": environment_id_property()},
                    "required": ["environmentId"]
                })),
            ApiEndpoint::new(Method::GET, "/environments/{environmentId}"),
        ),
        ApiTool::new(
            ToolDefinition::new("create_environment", ENVIRONMENTS, false)
                .with_policy(ValidationPolicy::not_applicable())
                .with_description("Create a new environment. New environments may be SANDBOX or PRODUCTION.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "minLength": 1},
                        "type": {"type": "string", "enum": ["SANDBOX", "PRODUCTION"]},
                        "region": {"type": "string"}
                    },
                    "required": ["name", "type"]
                })),
            ApiEndpoint::new(Method::POST, "/environments"),
        ),
        ApiTool::new(
            ToolDefinition::new("update_environment", ENVIRONMENTS, false)
                .with_description("Update an environment's name or description. Refused on PRODUCTION environments.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "name": {"type": "string", "minLength": 1},
                        "description": {"type": "string"}
                    },
                    "required": ["environmentId"]
                })),
            ApiEndpoint::new(Method::PUT, "/environments/{environmentId}"),
        ),
    ]
}

fn application_tools() -> Vec<ApiTool> {
    let application_id = json!({"type": "string", "description": "ID of the application"});

    vec![
        ApiTool::new(
            ToolDefinition::new("list_applications", APPLICATIONS, true)
                .with_policy(ValidationPolicy::allow_production_read())
                .with_description("List the applications registered in an environment.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 100}
                    },
                    "required": ["environmentId"]
                })),
            ApiEndpoint::new(Method::GET, "/environments/{environmentId}/applications"),
        ),
        ApiTool::new(
            ToolDefinition::new("get_application", APPLICATIONS, true)
                .with_policy(ValidationPolicy::allow_production_read())
                .with_description("Get one application in an environment.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "applicationId": application_id
                    },
                    "required": ["environmentId", "applicationId"]
                })),
            ApiEndpoint::new(
                Method::GET,
                "/environments/{environmentId}/applications/{applicationId}",
            ),
        ),
        ApiTool::new(
            ToolDefinition::new("create_application", APPLICATIONS, false)
                .with_description("Register a new application in an environment. Refused on PRODUCTION environments.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "name": {"type": "string", "minLength": 1},
                        "redirectUris": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["environmentId", "name"]
                })),
            ApiEndpoint::new(Method::POST, "/environments/{environmentId}/applications"),
        ),
        ApiTool::new(
            ToolDefinition::new("update_application", APPLICATIONS, false)
                .with_description("Update an application. Refused on PRODUCTION environments.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "applicationId": application_id,
                        "name": {"type": "string", "minLength": 1},
                        "redirectUris": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["environmentId", "applicationId"]
                })),
            ApiEndpoint::new(
                Method::PUT,
                "/environments/{environmentId}/applications/{applicationId}",
            ),
        ),
        ApiTool::new(
            ToolDefinition::new("delete_application", APPLICATIONS, false)
                .destructive()
                .with_description("Delete an application. Refused on PRODUCTION environments.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "applicationId": application_id
                    },
                    "required": ["environmentId", "applicationId"]
                })),
            ApiEndpoint::new(
                Method::DELETE,
                "/environments/{environmentId}/applications/{applicationId}",
            ),
        ),
    ]
}

fn population_tools() -> Vec<ApiTool> {
    vec![
        ApiTool::new(
            ToolDefinition::new("list_populations", POPULATIONS, true)
                .with_policy(ValidationPolicy::allow_production_read())
                .with_description("List the user populations of an environment.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {"environmentId": environment_id_property()},
                    "required": ["environmentId"]
                })),
            ApiEndpoint::new(Method::GET, "/environments/{environmentId}/populations"),
        ),
        ApiTool::new(
            ToolDefinition::new("create_population", POPULATIONS, false)
                .with_description("Create a user population in an environment. Refused on PRODUCTION environments.")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "environmentId": environment_id_property(),
                        "name": {"type": "string", "minLength": 1},
                        "description": {"type": "string"}
                    },
                    "required": ["environmentId", "name"]
                })),
            ApiEndpoint::new(Method::POST, "/environments/{environmentId}/populations"),
        ),
    ]
}
