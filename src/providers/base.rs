//! Base provider trait and common types for Sahayi
//!
//! This module defines the Provider trait that all LLM providers must
//! implement, along with the message, tool call, and response types
//! shared by the agent runtime.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Message structure for conversation
///
/// Represents a message in the conversation with the LLM provider.
/// Messages can be from the user, assistant, system, or tool results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional tool calls in the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::providers::Message;
    ///
    /// let msg = Message::user("I feel dizzy");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::providers::Message;
    ///
    /// let msg = Message::tool_result("call_1", "{\"name\":\"John Smith\"}");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id, Some("call_1".to_string()));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message with tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Returns true if this message requests at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }
}

/// Function call information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a tool call from a name and JSON arguments
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: &serde_json::Value) -> Self {
        Self {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: args.to_string(),
            },
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from a completion call
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The assistant message
    pub message: Message,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a response without usage information
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a response with usage information
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// LLM provider trait
///
/// Implementations translate the shared message format to a concrete
/// completion API. Tool definitions are passed as JSON values in the
/// `{name, description, parameters}` shape produced by
/// [`crate::tools::ToolExecutor::tool_definition`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request a completion for the given conversation
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Provider` or `SahayiError::Authentication`
    /// when the remote call fails
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Name of the model this provider talks to
    fn model_name(&self) -> String {
        "unknown".to_string()
    }
}

/// Drop tool messages that do not answer a preceding assistant tool call
///
/// Pruning can remove the assistant message that issued a tool call
/// while keeping its result; most APIs reject such sequences.
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    let valid_tool_ids: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role == "assistant")
        .filter_map(|m| m.tool_calls.as_ref())
        .flatten()
        .map(|call| call.id.as_str())
        .collect();

    messages
        .iter()
        .filter(|message| {
            if message.role != "tool" {
                return true;
            }
            match &message.tool_call_id {
                Some(id) if valid_tool_ids.contains(id.as_str()) => true,
                Some(id) => {
                    tracing::warn!("Dropping orphan tool message with tool_call_id: {}", id);
                    false
                }
                None => {
                    tracing::warn!("Dropping tool message without tool_call_id");
                    false
                }
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("a").role, "user");
        assert_eq!(Message::assistant("b").role, "assistant");
        assert_eq!(Message::system("c").role, "system");
        let tool = Message::tool_result("call_1", "d");
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_message_assistant_with_tools() {
        let call = ToolCall::new("call_1", "user_tool", &serde_json::json!({"request": "x"}));
        let msg = Message::assistant_with_tools(vec![call]);
        assert!(msg.content.is_none());
        assert!(msg.has_tool_calls());
    }

    #[test]
    fn test_has_tool_calls_empty_vec() {
        let msg = Message::assistant_with_tools(vec![]);
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_tool_call_new_serializes_arguments() {
        let call = ToolCall::new("id", "web_search", &serde_json::json!({"query": "police"}));
        let args: serde_json::Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["query"], "police");
    }

    #[test]
    fn test_message_serialization_skips_none() {
        let json = serde_json::to_string(&Message::user("Test")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_token_usage_new() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_validate_message_sequence_keeps_valid_pairs() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant_with_tools(vec![ToolCall::new(
                "call_1",
                "user_tool",
                &serde_json::json!({}),
            )]),
            Message::tool_result("call_1", "ok"),
        ];
        assert_eq!(validate_message_sequence(&messages).len(), 3);
    }

    #[test]
    fn test_validate_message_sequence_drops_orphans() {
        let mut no_id = Message::tool_result("x", "no id");
        no_id.tool_call_id = None;
        let messages = vec![
            Message::user("hi"),
            Message::tool_result("missing", "orphan"),
            no_id,
        ];
        let validated = validate_message_sequence(&messages);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].role, "user");
    }
}
