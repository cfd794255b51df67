//! Output formatting for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use std::str::FromStr;

use crate::mcp::tools::{ApiTool, FilterDecision};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'table'.", s),
        }
    }
}

/// One catalog tool and what the filter decided for it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRow {
    pub name: String,
    pub collection: String,
    pub operation: String,
    pub validation: &'static str,
    pub method: String,
    pub path: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_because: Option<&'static str>,
}

impl ToolRow {
    pub fn new(tool: &ApiTool, decision: FilterDecision) -> Self {
        let definition = &tool.definition;
        let policy = definition.effective_policy();
        let validation = if policy.not_applicable {
            "not-applicable"
        } else if !definition.requires_validation() {
            "production-allowed"
        } else {
            "required"
        };

        let excluded_because = match decision {
            FilterDecision::Include => None,
            FilterDecision::Exclude(reason) => Some(reason.as_str()),
        };

        Self {
            name: definition.name.clone(),
            collection: definition.collection.clone(),
            operation: definition.operation_type().to_string(),
            validation,
            method: tool.endpoint.method.to_string(),
            path: tool.endpoint.path.to_string(),
            enabled: excluded_because.is_none(),
            excluded_because,
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

pub fn render_tool_table(rows: &[ToolRow]) -> String {
    let mut out = format!(
        "{:<22} {:<14} {:<6} {:<19} {}\n",
        "TOOL", "COLLECTION", "OP", "VALIDATION", "STATUS"
    );
    for row in rows {
        let status = match row.excluded_because {
            None => "enabled".to_string(),
            Some(reason) => format!("disabled ({})", reason),
        };
        out.push_str(&format!(
            "{:<22} {:<14} {:<6} {:<19} {}\n",
            row.name, row.collection, row.operation, row.validation, status
        ));
    }
    out
}
