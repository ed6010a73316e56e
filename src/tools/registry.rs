//! Tool registry - manages the tools available to the agent

use std::collections::HashMap;

use crate::error::Result;
use crate::gigachat::ToolDefinition;

use super::traits::{Tool, ToolCall, ToolResult};

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call; an unknown tool is a failed result, not an error
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => Ok(ToolResult::failure(format!("Unknown tool: {}", call.name))),
        }
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input back"
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, args: Value) -> Result<ToolResult> {
            Ok(ToolResult::success(args.to_string()))
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.definitions().len(), 1);

        let call = ToolCall {
            id: "1".to_string(),
            name: "echo".to_string(),
            arguments: serde_json::json!({"x": 1}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failed_result() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "1".to_string(),
            name: "nope".to_string(),
            arguments: serde_json::json!({}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }
}
