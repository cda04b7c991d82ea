//! MCP tool definitions and registry

use crate::error::{McpError, Result, ToolError};
use crate::protocol::{CallToolResult, ToolDescriptor};
use async_trait::async_trait;
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

/// A callable tool exposed over MCP
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Human readable description
    fn description(&self) -> &str;

    /// JSON Schema of the `arguments` object
    fn input_schema(&self) -> Value;

    /// Run the tool. A `ToolError` is a tool-level failure, not a protocol error.
    async fn execute(&self, arguments: &Value) -> std::result::Result<String, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Name → tool mapping, populated once at startup
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(McpError::Internal(format!(
                "Tool '{}' is already registered",
                name
            )));
        }
        info!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Builder form of [`ToolRegistry::register`]
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Descriptors in registration order
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// Unknown names are a protocol error. Executor failures, including
    /// panics, become a result with `isError` set.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<CallToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        info!(tool = name, "Calling tool");

        let outcome = AssertUnwindSafe(tool.execute(arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ToolError::new("tool panicked")));

        Ok(match outcome {
            Ok(text) => CallToolResult::success(text),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                CallToolResult::failure(format!("Tool execution error: {}", e))
            }
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
