//! Startup tool filter
//!
//! Decides once, before registration, which catalog tools the server exposes.
//! Precedence, first match wins:
//!
//! 1. the tool or its collection is excluded
//! 2. the tool writes and write tools are disabled
//! 3. include lists are set and neither the tool nor its collection is in them
//! 4. otherwise the tool is included

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::definition::ToolDefinition;
use crate::config::ToolFilterConfig;
use crate::observability::MetricsRecorder;

/// Why a tool was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    Excluded,
    WritesDisabled,
    NotIncluded,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::Excluded => "excluded",
            ExclusionReason::WritesDisabled => "write_disabled",
            ExclusionReason::NotIncluded => "not_included",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Include,
    Exclude(ExclusionReason),
}

#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    config: ToolFilterConfig,
    metrics: MetricsRecorder,
}

impl ToolFilter {
    pub fn new(config: ToolFilterConfig) -> Self {
        Self { config, metrics: MetricsRecorder::new() }
    }

    pub fn config(&self) -> &ToolFilterConfig {
        &self.config
    }

    /// Pure decision for one tool; logs nothing
    pub fn decide(&self, tool: &ToolDefinition) -> FilterDecision {
        let config = &self.config;

        if config.exclude_tools.contains(&tool.name)
            || config.exclude_collections.contains(&tool.collection)
        {
            return FilterDecision::Exclude(ExclusionReason::Excluded);
        }

        if tool.is_write() && !config.enable_write_tools {
            return FilterDecision::Exclude(ExclusionReason::WritesDisabled);
        }

        if config.has_include_lists() && !self.explicitly_included(tool) {
            return FilterDecision::Exclude(ExclusionReason::NotIncluded);
        }

        FilterDecision::Include
    }

    pub fn should_include(&self, tool: &ToolDefinition) -> bool {
        self.decide(tool) == FilterDecision::Include
    }

    /// Keep the tools that pass the filter, logging every exclusion.
    ///
    /// A write tool that an include list asked for by name (or by collection)
    /// but the write switch blocked gets one warning naming it.
    pub fn apply<T: AsRef<ToolDefinition>>(&self, tools: Vec<T>) -> Vec<T> {
        self.warn_unknown_names(&tools);

        let total = tools.len();
        let included: Vec<T> = tools
            .into_iter()
            .filter(|tool| {
                let tool = tool.as_ref();
                match self.decide(tool) {
                    FilterDecision::Include => true,
                    FilterDecision::Exclude(reason) => {
                        self.metrics.record_filtered(reason.as_str());
                        if reason == ExclusionReason::WritesDisabled
                            && self.explicitly_included(tool)
                        {
                            warn!(
                                tool_name = %tool.name,
                                "Write tool '{}' was requested but write tools are disabled; pass --enable-write-tools to register it",
                                tool.name
                            );
                        } else {
                            debug!(tool_name = %tool.name, reason = reason.as_str(), "Tool filtered out");
                        }
                        false
                    }
                }
            })
            .collect();

        info!(total, included = included.len(), "Tool filter applied");
        included
    }

    fn explicitly_included(&self, tool: &ToolDefinition) -> bool {
        self.config.include_tools.contains(&tool.name)
            || self.config.include_collections.contains(&tool.collection)
    }

    fn warn_unknown_names<T: AsRef<ToolDefinition>>(&self, tools: &[T]) {
        let names: BTreeSet<&str> = tools.iter().map(|t| t.as_ref().name.as_str()).collect();
        let collections: BTreeSet<&str> =
            tools.iter().map(|t| t.as_ref().collection.as_str()).collect();

        for name in self.config.include_tools.iter().chain(&self.config.exclude_tools) {
            if !names.contains(name.as_str()) {
                warn!(tool_name = %name, "Tool filter names an unknown tool");
            }
        }
        for collection in
            self.config.include_collections.iter().chain(&self.config.exclude_collections)
        {
            if !collections.contains(collection.as_str()) {
                warn!(collection = %collection, "Tool filter names an unknown collection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(name: &str, collection: &str) -> ToolDefinition {
        ToolDefinition::new(name, collection, true)
    }

    fn write(name: &str, collection: &str) -> ToolDefinition {
        ToolDefinition::new(name, collection, false)
    }

    fn filter(
        include_tools: &str,
        exclude_tools: &str,
        include_collections: &str,
        exclude_collections: &str,
        writes: bool,
    ) -> ToolFilter {
        ToolFilter::new(ToolFilterConfig::from_comma_lists(
            include_tools,
            exclude_tools,
            include_collections,
            exclude_collections,
            writes,
        ))
    }

    #[test]
    fn test_default_config_includes_reads_only() {
        let filter = ToolFilter::default();
        assert!(filter.should_include(&read("get_environment", "environments")));
        assert_eq!(
            filter.decide(&write("update_environment", "environments")),
            FilterDecision::Exclude(ExclusionReason::WritesDisabled)
        );
    }

    #[test]
    fn test_exclusion_beats_inclusion() {
        let filter = filter("get_environment", "get_environment", "", "", true);
        assert_eq!(
            filter.decide(&read("get_environment", "environments")),
            FilterDecision::Exclude(ExclusionReason::Excluded)
        );
    }

    #[test]
    fn test_collection_exclusion_beats_tool_inclusion() {
        let filter = filter("get_application", "", "", "applications", true);
        assert!(!filter.should_include(&read("get_application", "applications")));
    }

    #[test]
    fn test_write_gate_runs_before_include_lists() {
        let filter = filter("update_environment", "", "", "", false);
        assert_eq!(
            filter.decide(&write("update_environment", "environments")),
            FilterDecision::Exclude(ExclusionReason::WritesDisabled)
        );
    }

    #[test]
    fn test_include_lists_narrow_the_set() {
        let filter = filter("list_populations", "", "environments", "", true);
        assert!(filter.should_include(&read("get_environment", "environments")));
        assert!(filter.should_include(&write("update_environment", "environments")));
        assert!(filter.should_include(&read("list_populations", "populations")));
        assert_eq!(
            filter.decide(&read("get_application", "applications")),
            FilterDecision::Exclude(ExclusionReason::NotIncluded)
        );
    }

    #[test]
    fn test_apply_keeps_order() {
        let filter = filter("", "", "", "", false);
        let kept = filter.apply(vec![
            read("list_environments", "environments"),
            write("create_environment", "environments"),
            read("get_environment", "environments"),
        ]);
        let names: Vec<&str> = kept.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["list_environments", "get_environment"]);
    }
}
