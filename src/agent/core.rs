//! Agent core implementation with the tool-calling execution loop
//!
//! The loop sends the conversation and tool definitions to the provider,
//! executes any tool calls the provider asks for, feeds the results back
//! and repeats until the provider answers with text. It is bounded by
//! `max_turns` and `timeout_seconds`.

use crate::config::AgentConfig;
use crate::error::{Result, SahayiError};
use crate::providers::{Message, Provider, TokenUsage, ToolCall};
use crate::tools::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::Conversation;

/// An LLM agent: provider, tools and a persistent conversation
///
/// # Examples
///
/// ```no_run
/// use sahayi::agent::Agent;
/// use sahayi::config::{AgentConfig, OllamaConfig};
/// use sahayi::providers::OllamaProvider;
/// use sahayi::tools::ToolRegistry;
///
/// # async fn example() -> sahayi::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let mut agent = Agent::new(provider, ToolRegistry::new(), AgentConfig::default())?
///     .with_system_prompt("You are a calm, patient helper.");
/// let reply = agent.execute("Hello").await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    conversation: Conversation,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent instance
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if `max_turns` is zero
    pub fn new(
        provider: impl Provider + 'static,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::from_shared(Arc::new(provider), tools, config)
    }

    /// Creates a new agent sharing an existing provider
    ///
    /// Sub-agents use this so every agent in a session reuses one HTTP
    /// client.
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if `max_turns` is zero
    pub fn from_shared(
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_turns == 0 {
            return Err(
                SahayiError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        let conversation = Conversation::new(
            config.conversation.max_tokens,
            config.conversation.min_retain_turns,
            config.conversation.prune_threshold.into(),
        );

        Ok(Self {
            provider,
            conversation,
            tools,
            config,
        })
    }

    /// Seeds the conversation with a system instruction
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation.add_system_message(prompt);
        self
    }

    /// Sends `user_prompt` and runs the loop until the provider answers
    ///
    /// The conversation, including tool calls and their results, is kept
    /// for the next call.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `SahayiError::MaxIterationsExceeded` when `max_turns` runs out
    /// - `SahayiError::Provider` on provider failures, timeouts, and
    ///   responses with neither text nor tool calls
    pub async fn execute(&mut self, user_prompt: impl Into<String>) -> Result<String> {
        let start_time = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        info!("Starting agent execution");
        self.conversation.add_user_message(user_prompt);

        let mut iteration = 0;

        loop {
            iteration += 1;

            if iteration > self.config.max_turns {
                warn!("Maximum iterations ({}) exceeded", self.config.max_turns);
                return Err(SahayiError::MaxIterationsExceeded {
                    limit: self.config.max_turns,
                    message: format!(
                        "Agent exceeded maximum iteration limit of {}",
                        self.config.max_turns
                    ),
                }
                .into());
            }

            let remaining = timeout.checked_sub(start_time.elapsed()).ok_or_else(|| {
                warn!("Agent execution timeout after {:?}", start_time.elapsed());
                SahayiError::Provider(format!(
                    "Agent execution timeout after {} seconds",
                    self.config.timeout_seconds
                ))
            })?;

            debug!(
                "Iteration {}/{}, tokens: {}/{}",
                iteration,
                self.config.max_turns,
                self.conversation.token_count(),
                self.conversation.max_tokens()
            );

            let tool_definitions = self.tools.all_definitions();
            let completion = tokio::time::timeout(
                remaining,
                self.provider
                    .complete(self.conversation.messages(), &tool_definitions),
            )
            .await
            .map_err(|_| {
                warn!("Provider call timed out");
                SahayiError::Provider(format!(
                    "Agent execution timeout after {} seconds",
                    self.config.timeout_seconds
                ))
            })??;

            if let Some(usage) = &completion.usage {
                self.conversation.update_from_provider_usage(usage);
            }

            let message = completion.message;

            if message.has_tool_calls() {
                let tool_calls = message.tool_calls.clone().unwrap_or_default();
                debug!("Executing {} tool calls", tool_calls.len());

                self.conversation.add_message(message);
                for tool_call in &tool_calls {
                    let result = self.execute_tool_call(tool_call).await;
                    self.conversation
                        .add_tool_result(&tool_call.id, result.to_message());
                }
                continue;
            }

            if let Some(content) = message.content {
                info!(
                    "Agent execution completed in {} iterations, {} ms",
                    iteration,
                    start_time.elapsed().as_millis()
                );
                self.conversation.add_assistant_message(content.clone());
                return Ok(content);
            }

            warn!("Provider returned neither content nor tool calls");
            return Err(SahayiError::Provider(
                "Provider returned invalid response (no content or tool calls)".to_string(),
            )
            .into());
        }
    }

    /// Executes one tool call; every failure becomes a tool error result
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> ToolResult {
        let tool_name = &tool_call.function.name;
        debug!("Executing tool: {}", tool_name);

        let Some(executor) = self.tools.get(tool_name) else {
            warn!("Model requested unknown tool: {}", tool_name);
            return ToolResult::error(format!("Tool not found: {}", tool_name));
        };

        let args: serde_json::Value = if tool_call.function.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&tool_call.function.arguments) {
                Ok(args) => args,
                Err(e) => {
                    return ToolResult::error(format!(
                        "Failed to parse tool arguments for '{}': {}",
                        tool_name, e
                    ))
                }
            }
        };

        let result = match executor.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool '{}' failed: {}", tool_name, e);
                ToolResult::error(format!("Tool '{}' execution failed: {}", tool_name, e))
            }
        };

        let original_len = result.output.len();
        let result = result.truncate_if_needed(self.config.tools.max_output_size);
        if result.truncated {
            debug!(
                "Tool output truncated from {} to {} bytes",
                original_len, self.config.tools.max_output_size
            );
        }
        result
    }

    /// Returns the conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the number of registered tools
    pub fn num_tools(&self) -> usize {
        self.tools.len()
    }

    /// Accumulated provider-reported token usage
    pub fn token_usage(&self) -> Option<TokenUsage> {
        self.conversation.provider_token_usage()
    }

    /// Forgets everything except system messages
    pub fn reset(&mut self) {
        let system: Vec<Message> = self
            .conversation
            .messages()
            .iter()
            .filter(|m| m.role == "system")
            .cloned()
            .collect();
        self.conversation.clear();
        for message in system {
            self.conversation.add_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CompletionResponse;
    use crate::tools::ToolExecutor;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider that records the messages it was sent
    #[derive(Clone)]
    struct MockProvider {
        responses: Vec<Message>,
        call_count: Arc<Mutex<usize>>,
        seen: Arc<Mutex<Vec<Vec<Message>>>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses,
                call_count: Arc::new(Mutex::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<CompletionResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut count = self.call_count.lock().unwrap();
            let index = *count;
            *count += 1;

            let message = self
                .responses
                .get(index)
                .cloned()
                .unwrap_or_else(|| Message::assistant("Done"));
            Ok(CompletionResponse::with_usage(message, TokenUsage::new(10, 5)))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn tool_definition(&self) -> serde_json::Value {
            serde_json::json!({
                "name": "echo",
                "description": "echo",
                "parameters": {"type": "object", "properties": {}}
            })
        }

        async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success(format!("echo: {}", args)))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolExecutor for FailingTool {
        fn tool_definition(&self) -> serde_json::Value {
            serde_json::json!({"name": "fail", "description": "fails", "parameters": {}})
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
            Err(SahayiError::Toolbox("service unavailable".to_string()).into())
        }
    }

    fn call(id: &str, name: &str) -> Message {
        Message::assistant_with_tools(vec![ToolCall::new(id, name, &serde_json::json!({"x": 1}))])
    }

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register("echo", Arc::new(EchoTool));
        tools.register("fail", Arc::new(FailingTool));
        tools
    }

    #[test]
    fn test_agent_creation_with_zero_max_turns_fails() {
        let config = AgentConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(Agent::new(MockProvider::new(vec![]), ToolRegistry::new(), config).is_err());
    }

    #[tokio::test]
    async fn test_execute_simple_response() {
        let mut agent = Agent::new(
            MockProvider::new(vec![Message::assistant("Hello, John!")]),
            ToolRegistry::new(),
            AgentConfig::default(),
        )
        .unwrap();

        assert_eq!(agent.execute("Say hello").await.unwrap(), "Hello, John!");
        assert_eq!(agent.conversation().len(), 2);
        assert_eq!(agent.token_usage().unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_tool_calls_are_recorded_before_results() {
        let provider = MockProvider::new(vec![call("call_1", "echo"), Message::assistant("ok")]);
        let seen = Arc::clone(&provider.seen);
        let mut agent = Agent::new(provider, registry(), AgentConfig::default()).unwrap();

        assert_eq!(agent.execute("use the tool").await.unwrap(), "ok");

        let second_request = &seen.lock().unwrap()[1];
        let roles: Vec<&str> = second_request.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool"]);
        assert!(second_request[1].has_tool_calls());
        assert_eq!(second_request[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(second_request[2]
            .content
            .as_deref()
            .unwrap()
            .contains("echo: {\"x\":1}"));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let provider = MockProvider::new(vec![call("call_1", "missing"), Message::assistant("sorry")]);
        let seen = Arc::clone(&provider.seen);
        let mut agent = Agent::new(provider, registry(), AgentConfig::default()).unwrap();

        assert_eq!(agent.execute("x").await.unwrap(), "sorry");
        let tool_message = &seen.lock().unwrap()[1][2];
        assert_eq!(tool_message.content.as_deref(), Some("Error: Tool not found: missing"));
    }

    #[tokio::test]
    async fn test_tool_failure_reported_to_model() {
        let provider = MockProvider::new(vec![call("call_1", "fail"), Message::assistant("retry later")]);
        let seen = Arc::clone(&provider.seen);
        let mut agent = Agent::new(provider, registry(), AgentConfig::default()).unwrap();

        assert_eq!(agent.execute("x").await.unwrap(), "retry later");
        let tool_message = &seen.lock().unwrap()[1][2];
        assert!(tool_message
            .content
            .as_deref()
            .unwrap()
            .contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_conversation_persists_across_calls() {
        let provider = MockProvider::new(vec![
            Message::assistant("May I know your name?"),
            Message::assistant("Thank you, John."),
        ]);
        let seen = Arc::clone(&provider.seen);
        let mut agent = Agent::new(provider, ToolRegistry::new(), AgentConfig::default())
            .unwrap()
            .with_system_prompt("be kind");

        agent.execute("hello").await.unwrap();
        agent.execute("John").await.unwrap();

        let second_request = &seen.lock().unwrap()[1];
        assert_eq!(second_request.len(), 4);
        assert_eq!(second_request[0].role, "system");
        assert_eq!(second_request[3].content.as_deref(), Some("John"));
    }

    #[tokio::test]
    async fn test_respects_max_iterations() {
        let responses = (0..10).map(|i| call(&format!("call_{}", i), "echo")).collect();
        let provider = MockProvider::new(responses);
        let config = AgentConfig {
            max_turns: 3,
            ..Default::default()
        };
        let mut agent = Agent::new(provider.clone(), registry(), config).unwrap();

        let err = agent.execute("loop").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SahayiError>(),
            Some(SahayiError::MaxIterationsExceeded { limit: 3, .. })
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let empty = Message {
            role: "assistant".to_string(),
            content: None,
            tool_calls: None,
            tool_call_id: None,
        };
        let mut agent =
            Agent::new(MockProvider::new(vec![empty]), ToolRegistry::new(), AgentConfig::default())
                .unwrap();
        assert!(agent.execute("x").await.is_err());
    }

    #[tokio::test]
    async fn test_reset_keeps_system_prompt() {
        let mut agent = Agent::new(
            MockProvider::new(vec![]),
            ToolRegistry::new(),
            AgentConfig::default(),
        )
        .unwrap()
        .with_system_prompt("sys");
        agent.execute("hi").await.unwrap();
        agent.reset();
        assert_eq!(agent.conversation().len(), 1);
        assert_eq!(agent.num_tools(), 0);
    }
}
