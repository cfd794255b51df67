//! Static tool metadata
//!
//! A [`ToolDefinition`] is built once at startup from the catalog and never
//! mutated. The registry owns the definitions that survive the filter.

use serde_json::{json, Value};

use crate::domain::{OperationType, ValidationPolicy};
use crate::mcp::protocol::{Tool, ToolAnnotations};

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    /// Named group the tool belongs to, matched by the collection filters
    pub collection: String,
    pub read_only: bool,
    pub destructive: bool,
    /// `None` means the default policy: PRODUCTION reads and writes both denied
    pub validation_policy: Option<ValidationPolicy>,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, collection: impl Into<String>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            read_only,
            destructive: false,
            validation_policy: None,
            description: String::new(),
            input_schema: json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = Some(policy);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    pub fn operation_type(&self) -> OperationType {
        OperationType::from_read_only(self.read_only)
    }

    pub fn is_write(&self) -> bool {
        !self.read_only
    }

    pub fn effective_policy(&self) -> ValidationPolicy {
        self.validation_policy.unwrap_or_default()
    }

    /// Whether a call to this tool must go through environment validation
    pub fn requires_validation(&self) -> bool {
        !self.effective_policy().skips_validation(self.operation_type())
    }

    pub fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations {
            title: None,
            read_only_hint: Some(self.read_only),
            destructive_hint: Some(self.destructive),
            idempotent_hint: Some(self.read_only),
            open_world_hint: Some(false),
        }
    }

    pub fn to_mcp_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            input_schema: self.input_schema.clone(),
            annotations: Some(self.annotations()),
        }
    }
}

impl AsRef<ToolDefinition> for ToolDefinition {
    fn as_ref(&self) -> &ToolDefinition {
        self
    }
}
