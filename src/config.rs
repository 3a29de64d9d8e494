//! Configuration management for Sahayi
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, SahayiError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider configuration
    pub provider: ProviderConfig,

    /// Remote toolbox (contact lookup) configuration
    #[serde(default)]
    pub toolbox: ToolboxConfig,

    /// Web search configuration used by the locator agents
    #[serde(default)]
    pub search: SearchConfig,

    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Session orchestration configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini" or "ollama"
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Gemini-specific configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Ollama-specific configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// API key; resolved from the environment or keyring when absent
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Optional sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            api_key: None,
            temperature: None,
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Remote toolbox configuration
///
/// The toolbox hosts the `search-contact-by-name` operation used to
/// fetch a citizen's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolboxConfig {
    /// Base URL of the toolbox server
    #[serde(default = "default_toolbox_url")]
    pub url: String,

    /// Name of the contact lookup tool
    #[serde(default = "default_contact_tool")]
    pub contact_tool: String,

    /// Request timeout in seconds
    #[serde(default = "default_toolbox_timeout")]
    pub timeout_seconds: u64,

    /// Optional bearer token for protected deployments
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
}

fn default_toolbox_url() -> String {
    "https://toolbox-702881475432.us-central1.run.app/".to_string()
}

fn default_contact_tool() -> String {
    "search-contact-by-name".to_string()
}

fn default_toolbox_timeout() -> u64 {
    30
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            url: default_toolbox_url(),
            contact_tool: default_contact_tool(),
            timeout_seconds: default_toolbox_timeout(),
            auth_token: None,
        }
    }
}

/// Web search configuration (Google Custom Search JSON API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint
    #[serde(default = "default_search_api_base")]
    pub api_base: String,

    /// API key; resolved from the environment or keyring when absent
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Programmable search engine id (`cx`)
    #[serde(default)]
    pub engine_id: Option<String>,

    /// Maximum results returned to the model (1-10)
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,
}

fn default_search_api_base() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_search_max_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    15
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_search_api_base(),
            api_key: None,
            engine_id: None,
            max_results: default_search_max_results(),
            timeout_seconds: default_search_timeout(),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of provider round trips per request
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Timeout for a single request in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Conversation management settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Tool execution settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_max_turns() -> usize {
    10
}

fn default_timeout() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            timeout_seconds: default_timeout(),
            conversation: ConversationConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Conversation management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum tokens allowed in conversation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Minimum number of turns to retain when pruning
    #[serde(default = "default_min_retain")]
    pub min_retain_turns: usize,

    /// Pruning threshold as a fraction of max_tokens (0.0-1.0)
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f32,
}

fn default_max_tokens() -> usize {
    100_000
}

fn default_min_retain() -> usize {
    5
}

fn default_prune_threshold() -> f32 {
    0.8
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_retain_turns: default_min_retain(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

/// Tool execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Maximum tool output size in bytes
    #[serde(default = "default_max_output")]
    pub max_output_size: usize,
}

fn default_max_output() -> usize {
    65_536
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_output_size: default_max_output(),
        }
    }
}

/// Orchestration mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Explicit state machine drives the conversation
    #[default]
    Guided,
    /// A single LLM orchestrator agent drives the conversation
    Assistant,
}

impl SessionMode {
    /// Parse a mode from a string (case-insensitive)
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "guided" => Ok(Self::Guided),
            "assistant" | "agent" => Ok(Self::Assistant),
            other => Err(SahayiError::Config(format!(
                "Invalid session mode: {}. Must be one of: guided, assistant",
                other
            ))
            .into()),
        }
    }
}

/// Intent classifier selection for guided mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Deterministic keyword matching only
    #[default]
    Keyword,
    /// Keyword matching, then the LLM for requests keywords cannot place
    Llm,
}

impl ClassifierKind {
    /// Parse a classifier kind from a string (case-insensitive)
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keyword" | "keywords" => Ok(Self::Keyword),
            "llm" => Ok(Self::Llm),
            other => Err(SahayiError::Config(format!(
                "Invalid classifier: {}. Must be one of: keyword, llm",
                other
            ))
            .into()),
        }
    }
}

/// Session orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Default orchestration mode
    #[serde(default)]
    pub mode: SessionMode,

    /// Intent classifier used in guided mode
    #[serde(default)]
    pub classifier: ClassifierKind,

    /// Number given to the user when a locator cannot be reached
    #[serde(default = "default_emergency_number")]
    pub emergency_number: String,
}

fn default_emergency_number() -> String {
    "112".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            classifier: ClassifierKind::default(),
            emergency_number: default_emergency_number(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// A missing file is not an error: defaults are used and a warning
    /// is logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "gemini".to_string(),
                gemini: GeminiConfig::default(),
                ollama: OllamaConfig::default(),
            },
            toolbox: ToolboxConfig::default(),
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SahayiError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SahayiError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("SAHAYI_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("SAHAYI_GEMINI_MODEL") {
            self.provider.gemini.model = model;
        }

        if let Some(key) = first_env(&["SAHAYI_GEMINI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"])
        {
            self.provider.gemini.api_key = Some(key);
        }

        if let Ok(host) = std::env::var("SAHAYI_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(model) = std::env::var("SAHAYI_OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }

        if let Ok(url) = std::env::var("SAHAYI_TOOLBOX_URL") {
            self.toolbox.url = url;
        }

        if let Ok(token) = std::env::var("SAHAYI_TOOLBOX_TOKEN") {
            self.toolbox.auth_token = Some(token);
        }

        if let Ok(key) = std::env::var("SAHAYI_SEARCH_API_KEY") {
            self.search.api_key = Some(key);
        }

        if let Ok(engine) = std::env::var("SAHAYI_SEARCH_ENGINE_ID") {
            self.search.engine_id = Some(engine);
        }

        if let Ok(max_turns) = std::env::var("SAHAYI_MAX_TURNS") {
            if let Ok(value) = max_turns.parse() {
                self.agent.max_turns = value;
            } else {
                tracing::warn!("Invalid SAHAYI_MAX_TURNS: {}", max_turns);
            }
        }

        if let Ok(timeout) = std::env::var("SAHAYI_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.agent.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid SAHAYI_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(mode) = std::env::var("SAHAYI_SESSION_MODE") {
            match SessionMode::parse_str(&mode) {
                Ok(m) => self.session.mode = m,
                Err(_) => tracing::warn!("Invalid SAHAYI_SESSION_MODE: {}, keeping current", mode),
            }
        }

        if let Ok(classifier) = std::env::var("SAHAYI_CLASSIFIER") {
            match ClassifierKind::parse_str(&classifier) {
                Ok(c) => self.session.classifier = c,
                Err(_) => {
                    tracing::warn!("Invalid SAHAYI_CLASSIFIER: {}, keeping current", classifier)
                }
            }
        }

        if let Ok(number) = std::env::var("SAHAYI_EMERGENCY_NUMBER") {
            self.session.emergency_number = number;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if cli.json_logs {
            self.logging.json = true;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(SahayiError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["gemini", "ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(SahayiError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if url::Url::parse(&self.toolbox.url).is_err() {
            return Err(SahayiError::Config(format!(
                "toolbox.url is not a valid URL: {}",
                self.toolbox.url
            ))
            .into());
        }

        if self.toolbox.contact_tool.trim().is_empty() {
            return Err(
                SahayiError::Config("toolbox.contact_tool cannot be empty".to_string()).into(),
            );
        }

        if self.search.max_results == 0 || self.search.max_results > 10 {
            return Err(SahayiError::Config(
                "search.max_results must be between 1 and 10".to_string(),
            )
            .into());
        }

        if self.agent.max_turns == 0 {
            return Err(
                SahayiError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.max_turns > 100 {
            return Err(SahayiError::Config(
                "max_turns must be less than or equal to 100".to_string(),
            )
            .into());
        }

        if self.agent.timeout_seconds == 0 {
            return Err(
                SahayiError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.agent.conversation.max_tokens == 0 {
            return Err(SahayiError::Config(
                "conversation.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.conversation.prune_threshold <= 0.0
            || self.agent.conversation.prune_threshold > 1.0
        {
            return Err(SahayiError::Config(
                "conversation.prune_threshold must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.agent.tools.max_output_size == 0 {
            return Err(SahayiError::Config(
                "tools.max_output_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.emergency_number.trim().is_empty() {
            return Err(SahayiError::Config(
                "session.emergency_number cannot be empty".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
}
