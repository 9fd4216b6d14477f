//! The closed set of tools the agent may call.

use crate::adapter::{SearchAdapter, SearchError};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: '{0}'")]
    Unknown(String),

    #[error("Tool '{0}' is registered more than once")]
    Duplicate(String),

    #[error("Tool '{0}' is not registered with this agent")]
    NotRegistered(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: SearchError,
    },
}

/// A tool the model can invoke by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Web search through the configured [`SearchAdapter`].
    Search,
}

impl Tool {
    pub const ALL: [Tool; 1] = [Tool::Search];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Search => "search_tavily",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Search => {
                "Search the web for current information. Arguments: {\"query\": \"search terms\"}"
            }
        }
    }

    /// Looks up a tool by the name the model used.
    pub fn from_name(name: &str) -> Result<Self, ToolError> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }

    /// Runs the tool with the model-provided arguments.
    pub async fn execute(
        &self,
        search: &dyn SearchAdapter,
        arguments: &JsonValue,
    ) -> Result<String, ToolError> {
        match self {
            Tool::Search => {
                let query = arguments
                    .get("query")
                    .and_then(JsonValue::as_str)
                    .filter(|query| !query.trim().is_empty())
                    .ok_or_else(|| ToolError::InvalidArguments {
                        tool: self.name().to_string(),
                        reason: "expected a non-empty string field 'query'".to_string(),
                    })?;

                search
                    .search(query)
                    .await
                    .map_err(|source| ToolError::Execution {
                        tool: self.name().to_string(),
                        source,
                    })
            }
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tools bound to one agent. Registration rejects duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSet {
    tools: Vec<Tool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every known tool.
    pub fn all() -> Self {
        Self {
            tools: Tool::ALL.to_vec(),
        }
    }

    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> Result<Self, ToolError> {
        let mut set = Self::new();
        for tool in tools {
            set.register(tool)?;
        }
        Ok(set)
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if self.tools.contains(&tool) {
            return Err(ToolError::Duplicate(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Resolves a model-provided name to a registered tool.
    pub fn resolve(&self, name: &str) -> Result<Tool, ToolError> {
        let tool = Tool::from_name(name)?;
        if self.tools.contains(&tool) {
            Ok(tool)
        } else {
            Err(ToolError::NotRegistered(name.to_string()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    /// One `- name: description` line per tool, for the system prompt.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoSearch;

    #[async_trait]
    impl SearchAdapter for EchoSearch {
        async fn search(&self, query: &str) -> Result<String, SearchError> {
            Ok(format!("results for {}", query))
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Tool::from_name("search_tavily").unwrap(), Tool::Search);
        assert!(matches!(
            Tool::from_name("delete_everything"),
            Err(ToolError::Unknown(name)) if name == "delete_everything"
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let err = ToolSet::from_tools([Tool::Search, Tool::Search]).unwrap_err();
        assert!(matches!(err, ToolError::Duplicate(_)));
    }

    #[test]
    fn test_resolve_requires_registration() {
        let empty = ToolSet::new();
        assert!(matches!(
            empty.resolve("search_tavily"),
            Err(ToolError::NotRegistered(_))
        ));
        assert_eq!(ToolSet::all().resolve("search_tavily").unwrap(), Tool::Search);
    }

    #[test]
    fn test_describe() {
        assert!(ToolSet::all().describe().starts_with("- search_tavily: Search the web"));
    }

    #[tokio::test]
    async fn test_search_execution() {
        let output = Tool::Search
            .execute(&EchoSearch, &json!({"query": "rust async"}))
            .await
            .unwrap();
        assert_eq!(output, "results for rust async");

        let err = Tool::Search
            .execute(&EchoSearch, &json!({"q": "rust"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
