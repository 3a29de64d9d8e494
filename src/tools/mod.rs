//! Tools module for Sahayi
//!
//! This module contains the tool abstraction used by the agent runtime, the
//! tool registry, and the tool implementations: web search, toolbox-hosted
//! tools, and agents exposed as tools.

pub mod agent_tool;
pub mod toolbox_tool;
pub mod web_search;

pub use agent_tool::AgentTool;
pub use toolbox_tool::ToolboxTool;
pub use web_search::WebSearchTool;

use crate::error::{Result, SahayiError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Tool definition structure
///
/// Represents a tool that can be called by the model, in the
/// `{name, description, parameters}` function calling shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's parameters
    pub parameters: serde_json::Value,
}

impl Tool {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Convert to the JSON value handed to providers
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

/// Result of a tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Whether the tool execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if execution failed
    pub error: Option<String>,
    /// Whether the output was truncated
    pub truncated: bool,
    /// Additional metadata about the execution
    pub metadata: HashMap<String, String>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            truncated: false,
            metadata: HashMap::new(),
        }
    }

    /// Create a failed tool result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            truncated: false,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the result
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Truncate output if it exceeds `max_size` bytes
    ///
    /// Truncation happens on a character boundary.
    pub fn truncate_if_needed(mut self, max_size: usize) -> Self {
        if self.output.len() > max_size {
            let mut cut = max_size;
            while !self.output.is_char_boundary(cut) {
                cut -= 1;
            }
            self.output.truncate(cut);
            self.output.push_str("\n... (truncated)");
            self.truncated = true;
        }
        self
    }

    /// Convert to the text placed in the conversation
    pub fn to_message(&self) -> String {
        if self.success {
            if self.truncated {
                format!("{}\n(Output truncated to fit context window)", self.output)
            } else {
                self.output.clone()
            }
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Tool executor trait for implementing tool execution logic
///
/// # Examples
///
/// ```
/// use sahayi::tools::{ToolExecutor, ToolResult};
/// use sahayi::error::Result;
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolExecutor for Echo {
///     fn tool_definition(&self) -> Value {
///         serde_json::json!({
///             "name": "echo",
///             "description": "Repeats its input",
///             "parameters": {"type": "object", "properties": {}}
///         })
///     }
///
///     async fn execute(&self, args: Value) -> Result<ToolResult> {
///         Ok(ToolResult::success(args.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Returns the tool definition as a JSON value
    fn tool_definition(&self) -> serde_json::Value;

    /// Executes the tool with the given arguments
    ///
    /// # Errors
    ///
    /// Returns error if execution fails in a way the tool cannot describe
    /// as a `ToolResult::error`
    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult>;
}

/// Registry of tools available to an agent
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool executor under `name`
    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    /// Get a tool executor by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    /// Names of all registered tools, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// All tool definitions, ordered by tool name
    pub fn all_definitions(&self) -> Vec<serde_json::Value> {
        self.tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|executor| executor.tool_definition())
            .collect()
    }

    /// Build a registry holding only the named tools
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if a name is not registered
    pub fn filtered(&self, names: &[String]) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for name in names {
            let executor = self
                .get(name)
                .ok_or_else(|| SahayiError::Config(format!("Unknown tool: {}", name)))?;
            registry.register(name.clone(), executor);
        }
        Ok(registry)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
