//! Agents exposed as tools
//!
//! An `AgentTool` lets one agent delegate a request to another: each call
//! builds a fresh child agent from an [`AgentSpec`], runs the request in
//! its own conversation and returns the child's final answer.

use crate::agents::AgentSpec;
use crate::config::AgentConfig;
use crate::error::{Result, SahayiError};
use crate::providers::Provider;
use crate::tools::{Tool, ToolExecutor, ToolRegistry, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum size of a child agent's answer before truncation
const AGENT_OUTPUT_MAX_SIZE: usize = 8192;

/// Input accepted by every agent tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentToolInput {
    /// What the parent wants the child agent to handle
    pub request: String,
}

/// Tool wrapper around an agent definition
///
/// # Examples
///
/// ```no_run
/// use sahayi::agents::AgentSpec;
/// use sahayi::config::{AgentConfig, OllamaConfig};
/// use sahayi::providers::{OllamaProvider, Provider};
/// use sahayi::tools::{AgentTool, ToolRegistry};
/// use std::sync::Arc;
///
/// # fn example() -> sahayi::error::Result<()> {
/// let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(OllamaConfig::default())?);
/// let tool = AgentTool::new(
///     "police_tool",
///     AgentSpec::police_locator(true),
///     provider,
///     ToolRegistry::new(),
///     AgentConfig::default(),
/// );
/// # Ok(())
/// # }
/// ```
pub struct AgentTool {
    tool_name: String,
    spec: AgentSpec,
    provider: Arc<dyn Provider>,
    registry: ToolRegistry,
    config: AgentConfig,
}

impl AgentTool {
    /// Create a tool named `tool_name` that runs `spec`
    ///
    /// `registry` holds the tools the child may use; it is filtered to the
    /// spec's tool list on every call.
    pub fn new(
        tool_name: impl Into<String>,
        spec: AgentSpec,
        provider: Arc<dyn Provider>,
        registry: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            spec,
            provider,
            registry,
            config,
        }
    }

    /// Name the tool is exposed under
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// The wrapped agent definition
    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }
}

#[async_trait]
impl ToolExecutor for AgentTool {
    fn tool_definition(&self) -> serde_json::Value {
        Tool::new(
            self.tool_name.clone(),
            self.spec.description.clone(),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": format!("Input for the {} agent", self.spec.name)
                    }
                },
                "required": ["request"]
            }),
        )
        .to_value()
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let input: AgentToolInput = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Invalid input for {}: {}",
                    self.tool_name, e
                )))
            }
        };

        if input.request.trim().is_empty() {
            return Ok(ToolResult::error("request cannot be empty"));
        }

        tracing::info!(agent = %self.spec.name, "Delegating request to agent");

        let mut child = self
            .spec
            .build(Arc::clone(&self.provider), &self.registry, self.config.clone())?;

        let answer = child.execute(input.request).await.map_err(|e| {
            SahayiError::Tool(format!("Agent '{}' failed: {}", self.spec.name, e))
        })?;

        let mut result = ToolResult::success(answer).with_metadata("agent", &self.spec.name);
        if let Some(usage) = child.token_usage() {
            result = result.with_metadata("tokens_used", usage.total_tokens.to_string());
        }

        Ok(result.truncate_if_needed(AGENT_OUTPUT_MAX_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, Message, ToolCall};
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<Message>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<CompletionResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut responses = self.responses.lock().unwrap();
            let message = if responses.is_empty() {
                Message::assistant("default")
            } else {
                responses.remove(0)
            };
            Ok(CompletionResponse::new(message))
        }
    }

    struct StaticTool(&'static str);

    #[async_trait]
    impl ToolExecutor for StaticTool {
        fn tool_definition(&self) -> serde_json::Value {
            serde_json::json!({"name": "web_search", "description": "search", "parameters": {}})
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success(self.0))
        }
    }

    fn tool_with(provider: Arc<ScriptedProvider>) -> AgentTool {
        let mut registry = ToolRegistry::new();
        registry.register("web_search", Arc::new(StaticTool("1. Central Police Station")));
        AgentTool::new(
            "police_tool",
            AgentSpec::police_locator(true),
            provider,
            registry,
            AgentConfig::default(),
        )
    }

    #[test]
    fn test_tool_definition() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let definition = tool_with(provider).tool_definition();
        assert_eq!(definition["name"], "police_tool");
        assert_eq!(definition["parameters"]["required"][0], "request");
    }

    #[tokio::test]
    async fn test_execute_runs_child_with_instruction_and_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant_with_tools(vec![ToolCall::new(
                "call_1",
                "web_search",
                &serde_json::json!({"query": "police near 12 Elm St"}),
            )]),
            Message::assistant("Central Police Station, 1 km away."),
        ]));
        let tool = tool_with(Arc::clone(&provider));

        let result = tool
            .execute(serde_json::json!({"request": "I am at 12 Elm St"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "Central Police Station, 1 km away.");
        assert_eq!(
            result.metadata.get("agent").map(String::as_str),
            Some("nearest_police_locator")
        );

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0][0].role, "system");
        assert_eq!(seen[1][3].content.as_deref(), Some("1. Central Police Station"));
    }

    #[tokio::test]
    async fn test_each_call_uses_fresh_conversation() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant("first"),
            Message::assistant("second"),
        ]));
        let tool = tool_with(Arc::clone(&provider));

        tool.execute(serde_json::json!({"request": "a"})).await.unwrap();
        tool.execute(serde_json::json!({"request": "b"})).await.unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[1].len(), 2);
        assert_eq!(seen[1][1].content.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = tool_with(provider)
            .execute(serde_json::json!({"request": " "}))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_execute_rejects_wrong_shape() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = tool_with(provider)
            .execute(serde_json::json!({"query": "x"}))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
