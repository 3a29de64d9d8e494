//! Web search tool backed by the Google Custom Search JSON API
//!
//! The locator agents use this to find police stations and medical
//! facilities near a location the citizen described.

use crate::config::SearchConfig;
use crate::error::{Result, SahayiError};
use crate::tools::{Tool, ToolExecutor, ToolResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Name under which the tool is registered
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// A single search hit
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchItem {
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Result URL
    #[serde(default)]
    pub link: String,
    /// Text snippet
    #[serde(default)]
    pub snippet: String,
}

/// Web search tool
///
/// # Examples
///
/// ```no_run
/// use sahayi::config::SearchConfig;
/// use sahayi::tools::{ToolExecutor, WebSearchTool};
///
/// # async fn example() -> sahayi::error::Result<()> {
/// let tool = WebSearchTool::new(SearchConfig {
///     api_key: Some("key".to_string()),
///     engine_id: Some("cx".to_string()),
///     ..Default::default()
/// })?;
/// let result = tool
///     .execute(serde_json::json!({"query": "police station near MG Road"}))
///     .await?;
/// println!("{}", result.output);
/// # Ok(())
/// # }
/// ```
pub struct WebSearchTool {
    client: Client,
    config: SearchConfig,
    api_key: String,
    engine_id: String,
}

impl WebSearchTool {
    /// Create a new web search tool
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::MissingCredentials` if the API key or engine id
    /// is not configured
    pub fn new(config: SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SahayiError::MissingCredentials("search api key".to_string()))?;
        let engine_id = config
            .engine_id
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SahayiError::MissingCredentials("search engine id".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("sahayi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SahayiError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
            engine_id,
        })
    }

    /// Run a search and return the hits
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Search` on transport failures, non-success
    /// statuses and unparseable bodies
    pub async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        tracing::debug!("Searching the web: {}", query);

        let num = self.config.max_results.to_string();
        let response = self
            .client
            .get(&self.config.api_base)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SahayiError::Search(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Search returned {}: {}", status, body);
            return Err(SahayiError::Search(format!("Search returned {}: {}", status, body)).into());
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SahayiError::Search(format!("Failed to parse search response: {}", e)))?;

        let mut items = body.items;
        items.truncate(self.config.max_results);
        Ok(items)
    }
}

/// Render hits as a numbered list the model can read
pub fn format_results(items: &[SearchItem]) -> String {
    if items.is_empty() {
        return "No results found".to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            format!(
                "{}. {}\n   {}\n   {}",
                idx + 1,
                item.title.trim(),
                item.link.trim(),
                item.snippet.split_whitespace().collect::<Vec<_>>().join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ToolExecutor for WebSearchTool {
    fn tool_definition(&self) -> serde_json::Value {
        Tool::new(
            WEB_SEARCH_TOOL_NAME,
            "Search the web. Returns titles, links and snippets of the top results.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query, e.g. 'nearest police station to MG Road, Bengaluru'"
                    }
                },
                "required": ["query"]
            }),
        )
        .to_value()
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let input: SearchInput = match serde_json::from_value(args) {
            Ok(input) => input,
            Err(e) => return Ok(ToolResult::error(format!("Invalid search input: {}", e))),
        };

        if input.query.trim().is_empty() {
            return Ok(ToolResult::error("query cannot be empty"));
        }

        match self.search(input.query.trim()).await {
            Ok(items) => Ok(ToolResult::success(format_results(&items))
                .with_metadata("result_count", items.len().to_string())),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}
