//! Provider module for Sahayi
//!
//! This module contains the LLM provider abstraction and implementations
//! for Gemini and Ollama.

pub mod base;
pub mod gemini;
pub mod ollama;

pub use base::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider, TokenUsage,
    ToolCall,
};
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::{Result, SahayiError};

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `provider_type` - Type of provider ("gemini" or "ollama")
/// * `config` - Provider configuration
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(provider_type: &str, config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    create_provider_with_override(config, Some(provider_type), None)
}

/// Create a provider instance with optional provider and model overrides
///
/// Used by the CLI `--provider` flag and by agents that pin a model
/// different from the configured default.
///
/// # Examples
///
/// ```no_run
/// use sahayi::config::{GeminiConfig, OllamaConfig, ProviderConfig};
/// use sahayi::providers::create_provider_with_override;
///
/// # fn example() -> sahayi::error::Result<()> {
/// let config = ProviderConfig {
///     provider_type: "gemini".to_string(),
///     gemini: GeminiConfig::default(),
///     ollama: OllamaConfig::default(),
/// };
///
/// let local = create_provider_with_override(&config, Some("ollama"), Some("qwen2.5:7b"))?;
/// # Ok(())
/// # }
/// ```
pub fn create_provider_with_override(
    config: &ProviderConfig,
    provider_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<Box<dyn Provider>> {
    let provider_type = provider_override.unwrap_or(&config.provider_type);

    match provider_type {
        "gemini" => {
            let mut gemini_config = config.gemini.clone();
            if let Some(model) = model_override {
                gemini_config.model = model.to_string();
            }
            Ok(Box::new(GeminiProvider::new(gemini_config)?))
        }
        "ollama" => {
            let mut ollama_config = config.ollama.clone();
            if let Some(model) = model_override {
                ollama_config.model = model.to_string();
            }
            Ok(Box::new(OllamaProvider::new(ollama_config)?))
        }
        _ => Err(SahayiError::Provider(format!("Unknown provider type: {}", provider_type)).into()),
    }
}
