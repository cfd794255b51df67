//! Startup wiring
//!
//! Builds the request pipeline once from the resolved configuration:
//! catalog → filter → registry → validator → authorization layer → handler.
//! Everything built here is immutable afterwards and shared by reference.

use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{info, warn};

use crate::client::StaticTokenClientFactory;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::mcp::tools::{catalog, ApiTool, ToolFilter};
use crate::mcp::{AuthorizationLayer, AuthorizationService, McpHandler, ToolRegistry};
use crate::validation::CachingEnvironmentValidator;

const INSTRUCTIONS: &str = "Tools that target an environment take an `environmentId` argument. \
Calls that would modify a PRODUCTION environment are refused.";

/// The assembled request pipeline and the parts tests and the CLI inspect
pub struct Gateway {
    pub tools: Vec<ApiTool>,
    pub registry: Arc<ToolRegistry>,
    pub validator: Arc<CachingEnvironmentValidator>,
    pub service: AuthorizationService<McpHandler>,
}

/// Catalog tools that pass the configured filter
pub fn select_tools(config: &AppConfig) -> Vec<ApiTool> {
    ToolFilter::new(config.tools.clone()).apply(catalog())
}

pub fn build_gateway(config: &AppConfig) -> Result<Gateway> {
    let clients = Arc::new(StaticTokenClientFactory::new(&config.api)?);
    if config.api.access_token.is_none() {
        warn!("No access token configured; every governed tool call will be denied");
    }

    let tools = select_tools(config);
    let registry =
        Arc::new(ToolRegistry::new(tools.iter().map(|tool| tool.definition.clone()))?);
    let validator = Arc::new(CachingEnvironmentValidator::new(clients.clone()));

    let handler = McpHandler::from_api_tools(&tools, clients).with_instructions(INSTRUCTIONS);
    let service = ServiceBuilder::new()
        .layer(AuthorizationLayer::new(
            registry.clone(),
            validator.clone(),
            config.authorization.unknown_tools,
        ))
        .service(handler);

    info!(tools = ?registry.names(), "Registered tools");

    Ok(Gateway { tools, registry, validator, service })
}
