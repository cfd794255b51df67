//! # Command Line Interface
//!
//! Flags override the `ENVGATE_*` environment configuration. With no
//! subcommand the binary runs the stdio MCP server.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{parse_name_list, AppConfig, LogFormat, UnknownToolPolicy};
use crate::mcp::tools::{catalog, ToolFilter};
use crate::mcp::McpStdioServer;
use crate::observability::{init_observability, log_config_info};
use crate::startup::build_gateway;
use output::{print_json, render_tool_table, OutputFormat, ToolRow};

#[derive(Parser, Debug)]
#[command(name = "envgate")]
#[command(about = "Production-safety gate for management API MCP tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Comma-separated tool names to register (others are skipped)
    #[arg(long, global = true)]
    pub include_tools: Option<String>,

    /// Comma-separated tool names never to register
    #[arg(long, global = true)]
    pub exclude_tools: Option<String>,

    /// Comma-separated tool collections to register
    #[arg(long, global = true)]
    pub include_tool_collections: Option<String>,

    /// Comma-separated tool collections never to register
    #[arg(long, global = true)]
    pub exclude_tool_collections: Option<String>,

    /// Register tools that create, update or delete resources
    #[arg(long, global = true)]
    pub enable_write_tools: bool,

    /// Base URL of the management API
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Bearer token for the management API
    #[arg(long, global = true, env = "ENVGATE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Let calls to unregistered tools through without validation
    #[arg(long, global = true)]
    pub allow_unknown_tools: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format: compact or json
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// Show every catalog tool and whether the current filter enables it
    ListTools {
        /// Output format (json or table)
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },
}

impl Cli {
    /// Apply command line overrides on top of the environment configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(raw) = &self.include_tools {
            config.tools.include_tools = parse_name_list(raw);
        }
        if let Some(raw) = &self.exclude_tools {
            config.tools.exclude_tools = parse_name_list(raw);
        }
        if let Some(raw) = &self.include_tool_collections {
            config.tools.include_collections = parse_name_list(raw);
        }
        if let Some(raw) = &self.exclude_tool_collections {
            config.tools.exclude_collections = parse_name_list(raw);
        }
        if self.enable_write_tools {
            config.tools.enable_write_tools = true;
        }
        if let Some(url) = &self.api_base_url {
            config.api.base_url = url.clone();
        }
        if let Some(token) = self.access_token.as_ref().filter(|t| !t.trim().is_empty()) {
            config.api.access_token = Some(token.clone());
        }
        if let Some(timeout) = self.timeout {
            config.api.timeout_seconds = timeout;
            config.api.connect_timeout_seconds = config.api.connect_timeout_seconds.min(timeout);
        }
        if self.allow_unknown_tools {
            config.authorization.unknown_tools = UnknownToolPolicy::PassThrough;
        }
        if self.verbose {
            config.observability.log_level = "debug".to_string();
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_observability(&config.observability);
    log_config_info(&config);

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config).await,
        Commands::ListTools { output } => list_tools(&config, output),
    }
}

async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let gateway = build_gateway(config).context("Failed to build request pipeline")?;
    let server = McpStdioServer::new(gateway.service);

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    server.run().await.context("MCP stdio server failed")?;
    Ok(())
}

fn list_tools(config: &AppConfig, output: OutputFormat) -> anyhow::Result<()> {
    let filter = ToolFilter::new(config.tools.clone());
    let rows: Vec<ToolRow> =
        catalog().iter().map(|tool| ToolRow::new(tool, filter.decide(&tool.definition))).collect();

    match output {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            print!("{}", render_tool_table(&rows));
            Ok(())
        }
    }
}
