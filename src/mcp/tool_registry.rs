//! MCP Tool Registry
//!
//! Index from tool name to [`ToolDefinition`] for the tools that survived the
//! startup filter. Built once and never written again, so lookups need no
//! synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::mcp::tools::ToolDefinition;

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolDefinition>>,
}

impl ToolRegistry {
    /// Index `tools` by name. Duplicate names are a configuration error.
    pub fn new<I>(tools: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<ToolDefinition>>,
    {
        let mut index = HashMap::new();
        for tool in tools {
            let name = tool.name.clone();
            if index.insert(name.clone(), tool).is_some() {
                return Err(Error::config(format!("Tool '{}' is registered twice", name)));
            }
        }
        Ok(Self { tools: index })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolDefinition>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
