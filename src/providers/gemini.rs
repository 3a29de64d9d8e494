//! Gemini provider implementation for Sahayi
//!
//! Talks to the Generative Language `generateContent` REST endpoint.
//! The shared message format is mapped onto Gemini's content model:
//! system messages become `systemInstruction`, assistant messages use the
//! `model` role, tool calls map to `functionCall` parts and tool results
//! to `functionResponse` parts.

use crate::config::GeminiConfig;
use crate::error::{Result, SahayiError};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage, ToolCall};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use sahayi::config::GeminiConfig;
/// use sahayi::providers::{GeminiProvider, Provider, Message};
///
/// # async fn example() -> sahayi::error::Result<()> {
/// let config = GeminiConfig {
///     api_key: Some("key".to_string()),
///     ..Default::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::MissingCredentials` when no API key is
    /// configured, or a provider error if the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SahayiError::MissingCredentials("gemini".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("sahayi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SahayiError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> GenerateContentRequest {
        let messages = crate::providers::validate_message_sequence(messages);

        // functionResponse parts need the function name, which only the
        // originating assistant tool call carries.
        let call_names: HashMap<String, String> = messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .flatten()
            .map(|c| (c.id.clone(), c.function.name.clone()))
            .collect();

        let mut system_parts = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for message in &messages {
            match message.role.as_str() {
                "system" => {
                    if let Some(text) = &message.content {
                        system_parts.push(Part {
                            text: Some(text.clone()),
                            ..Default::default()
                        });
                    }
                }
                "assistant" => {
                    let mut parts = Vec::new();
                    if let Some(text) = message.content.as_ref().filter(|t| !t.is_empty()) {
                        parts.push(Part {
                            text: Some(text.clone()),
                            ..Default::default()
                        });
                    }
                    for call in message.tool_calls.iter().flatten() {
                        parts.push(Part {
                            function_call: Some(GeminiFunctionCall {
                                name: call.function.name.clone(),
                                args: serde_json::from_str(&call.function.arguments)
                                    .unwrap_or_else(|_| serde_json::json!({})),
                            }),
                            ..Default::default()
                        });
                    }
                    if !parts.is_empty() {
                        push_content(&mut contents, "model", parts);
                    }
                }
                "tool" => {
                    let name = message
                        .tool_call_id
                        .as_ref()
                        .and_then(|id| call_names.get(id))
                        .cloned()
                        .unwrap_or_default();
                    let output = message.content.clone().unwrap_or_default();
                    let response = serde_json::from_str::<serde_json::Value>(&output)
                        .ok()
                        .filter(|v| v.is_object())
                        .unwrap_or_else(|| serde_json::json!({ "content": output }));
                    push_content(
                        &mut contents,
                        "user",
                        vec![Part {
                            function_response: Some(GeminiFunctionResponse { name, response }),
                            ..Default::default()
                        }],
                    );
                }
                _ => {
                    let text = message.content.clone().unwrap_or_default();
                    push_content(
                        &mut contents,
                        "user",
                        vec![Part {
                            text: Some(text),
                            ..Default::default()
                        }],
                    );
                }
            }
        }

        let declarations: Vec<FunctionDeclaration> = tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(FunctionDeclaration {
                    name: obj.get("name")?.as_str()?.to_string(),
                    description: obj.get("description")?.as_str()?.to_string(),
                    parameters: obj.get("parameters")?.clone(),
                })
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
            tools: if declarations.is_empty() {
                Vec::new()
            } else {
                vec![GeminiTool {
                    function_declarations: declarations,
                }]
            },
            generation_config: self
                .config
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }

    fn convert_candidate(&self, content: Content) -> Message {
        let mut text = String::new();
        let mut calls = Vec::new();

        for (idx, part) in content.parts.into_iter().enumerate() {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let id = format!("call_{}_{}", idx, uuid::Uuid::new_v4().simple());
                calls.push(ToolCall::new(id, call.name, &call.args));
            }
        }

        if calls.is_empty() {
            Message::assistant(text)
        } else {
            let mut message = Message::assistant_with_tools(calls);
            if !text.is_empty() {
                message.content = Some(text);
            }
            message
        }
    }
}

/// Append parts, merging with the previous content when the role repeats
///
/// Gemini expects user/model turns to alternate, and several tool results
/// answering one model turn must travel in a single content block.
fn push_content(contents: &mut Vec<Content>, role: &str, parts: Vec<Part>) {
    if let Some(last) = contents.last_mut() {
        if last.role.as_deref() == Some(role) {
            last.parts.extend(parts);
            return;
        }
    }
    contents.push(Content {
        role: Some(role.to_string()),
        parts,
    });
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let request = self.build_request(messages, tools);

        tracing::debug!(
            "Sending Gemini request: model={}, {} contents, {} tool declarations",
            self.config.model,
            request.contents.len(),
            request
                .tools
                .first()
                .map(|t| t.function_declarations.len())
                .unwrap_or(0)
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                SahayiError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini rejected credentials {}: {}", status, error_text);
            return Err(SahayiError::Authentication(format!(
                "Gemini returned {}: {}",
                status, error_text
            ))
            .into());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(SahayiError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            SahayiError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            SahayiError::Provider("Gemini returned no candidates".to_string())
        })?;

        tracing::debug!("Gemini finish reason: {:?}", candidate.finish_reason);

        let content = candidate.content.ok_or_else(|| {
            SahayiError::Provider(format!(
                "Gemini returned an empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let message = self.convert_candidate(content);

        Ok(match body.usage_metadata {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count),
            ),
            None => CompletionResponse::new(message),
        })
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}
