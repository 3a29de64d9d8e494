//! Ollama provider implementation for Sahayi
//!
//! Connects to a local or remote Ollama server to generate completions
//! with tool calling support. Useful for running the helper fully offline.

use crate::config::OllamaConfig;
use crate::error::{Result, SahayiError};
use crate::providers::{CompletionResponse, FunctionCall, Message, Provider, TokenUsage, ToolCall};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use sahayi::config::OllamaConfig;
/// use sahayi::providers::{OllamaProvider, Provider, Message};
///
/// # async fn example() -> sahayi::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

fn default_tool_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("sahayi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SahayiError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}",
            config.host,
            config.model
        );

        Ok(Self { client, config })
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        crate::providers::validate_message_sequence(messages)
            .into_iter()
            .filter(|m| m.content.is_some() || m.tool_calls.is_some())
            .map(|m| {
                let tool_calls = m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| OllamaToolCall {
                            id: tc.id.clone(),
                            r#type: "function".to_string(),
                            function: OllamaFunctionCall {
                                name: tc.function.name.clone(),
                                arguments: serde_json::from_str(&tc.function.arguments)
                                    .unwrap_or(serde_json::Value::Object(serde_json::Map::new())),
                            },
                        })
                        .collect()
                });

                OllamaMessage {
                    role: m.role,
                    content: m.content.unwrap_or_default(),
                    tool_calls,
                }
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<OllamaTool> {
        tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(OllamaTool {
                    r#type: "function".to_string(),
                    function: OllamaFunction {
                        name: obj.get("name")?.as_str()?.to_string(),
                        description: obj.get("description")?.as_str()?.to_string(),
                        parameters: obj.get("parameters")?.clone(),
                    },
                })
            })
            .collect()
    }

    fn convert_response_message(&self, ollama_msg: OllamaMessage) -> Message {
        match ollama_msg.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => {
                let converted = tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(idx, tc)| ToolCall {
                        id: if tc.id.is_empty() {
                            format!("call_{}_{}", idx, uuid::Uuid::new_v4().simple())
                        } else {
                            tc.id
                        },
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: serde_json::to_string(&tc.function.arguments)
                                .unwrap_or_else(|_| "{}".to_string()),
                        },
                    })
                    .collect();
                Message::assistant_with_tools(converted)
            }
            _ => Message::assistant(ollama_msg.content),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let ollama_request = OllamaRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            stream: false,
        };

        tracing::debug!(
            "Sending Ollama request: {} messages, {} tools",
            ollama_request.messages.len(),
            ollama_request.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                SahayiError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(SahayiError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            SahayiError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Ollama response: done={}, prompt_tokens={}, completion_tokens={}",
            ollama_response.done,
            ollama_response.prompt_eval_count,
            ollama_response.eval_count
        );

        let message = self.convert_response_message(ollama_response.message);

        if ollama_response.prompt_eval_count > 0 || ollama_response.eval_count > 0 {
            let usage = TokenUsage::new(
                ollama_response.prompt_eval_count,
                ollama_response.eval_count,
            );
            Ok(CompletionResponse::with_usage(message, usage))
        } else {
            Ok(CompletionResponse::new(message))
        }
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(OllamaConfig::default()).unwrap()
    }

    #[test]
    fn test_new_keeps_config() {
        let p = provider();
        assert_eq!(p.config.host, "http://localhost:11434");
        assert_eq!(p.model_name(), "llama3.2:latest");
    }

    #[test]
    fn test_convert_tools_skips_malformed() {
        let tools = vec![
            serde_json::json!({
                "name": "web_search",
                "description": "Search the web",
                "parameters": {"type": "object"}
            }),
            serde_json::json!({"name": "missing_fields"}),
        ];
        let converted = provider().convert_tools(&tools);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "web_search");
    }

    #[test]
    fn test_convert_messages_parses_tool_arguments() {
        let messages = vec![
            Message::user("find police"),
            Message::assistant_with_tools(vec![ToolCall::new(
                "call_1",
                "web_search",
                &serde_json::json!({"query": "police near Elm St"}),
            )]),
            Message::tool_result("call_1", "1. Central Police Station"),
        ];
        let converted = provider().convert_messages(&messages);
        assert_eq!(converted.len(), 3);
        let calls = converted[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments["query"], "police near Elm St");
        assert_eq!(converted[2].role, "tool");
    }

    #[test]
    fn test_convert_response_assigns_missing_ids() {
        let msg = OllamaMessage {
            role: "assistant".to_string(),
            content: String::new(),
            tool_calls: Some(vec![OllamaToolCall {
                id: String::new(),
                r#type: "function".to_string(),
                function: OllamaFunctionCall {
                    name: "web_search".to_string(),
                    arguments: serde_json::json!({"query": "hospital"}),
                },
            }]),
        };
        let converted = provider().convert_response_message(msg);
        let calls = converted.tool_calls.unwrap();
        assert!(calls[0].id.starts_with("call_0_"));
        assert!(calls[0].function.arguments.contains("hospital"));
    }

    #[test]
    fn test_convert_response_plain_text() {
        let msg = OllamaMessage {
            role: "assistant".to_string(),
            content: "Hello".to_string(),
            tool_calls: None,
        };
        let converted = provider().convert_response_message(msg);
        assert_eq!(converted.content.as_deref(), Some("Hello"));
        assert!(converted.tool_calls.is_none());
    }
}
