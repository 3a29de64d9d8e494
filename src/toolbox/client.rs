//! HTTP client for the remote toolbox service
//!
//! Speaks two endpoints:
//!
//! - `GET {url}/api/tool/{name}` returns the tool manifest
//! - `POST {url}/api/tool/{name}/invoke` runs the tool and returns
//!   `{"result": ...}`

use crate::config::ToolboxConfig;
use crate::error::{Result, SahayiError};
use crate::toolbox::{ToolManifest, ToolSchema};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    result: serde_json::Value,
}

/// Toolbox client
///
/// # Examples
///
/// ```no_run
/// use sahayi::config::ToolboxConfig;
/// use sahayi::toolbox::ToolboxClient;
///
/// # async fn example() -> sahayi::error::Result<()> {
/// let client = ToolboxClient::new(&ToolboxConfig::default())?;
/// let rows = client
///     .invoke("search-contact-by-name", &serde_json::json!({"name": "John Smith"}))
///     .await?;
/// println!("{}", rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolboxClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ToolboxClient {
    /// Create a client for the configured toolbox
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if the URL is invalid, or
    /// `SahayiError::Toolbox` if the HTTP client cannot be built
    pub fn new(config: &ToolboxConfig) -> Result<Self> {
        let mut url = config.url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        let base_url = Url::parse(&url)
            .map_err(|e| SahayiError::Config(format!("Invalid toolbox url {}: {}", config.url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("sahayi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SahayiError::Toolbox(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SahayiError::Toolbox(format!("Invalid toolbox path {}: {}", path, e)).into())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the manifest describing `name`
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Toolbox` if the request fails or the manifest
    /// does not describe the requested tool
    pub async fn load_tool(&self, name: &str) -> Result<ToolManifest> {
        let url = self.endpoint(&format!("api/tool/{}", name))?;
        tracing::debug!("Loading toolbox manifest: {}", url);

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| SahayiError::Toolbox(format!("Failed to load tool '{}': {}", name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SahayiError::Toolbox(format!(
                "Loading tool '{}' returned {}: {}",
                name,
                status,
                error_message(&body)
            ))
            .into());
        }

        let manifest: ToolManifest = response.json().await.map_err(|e| {
            SahayiError::Toolbox(format!("Malformed manifest for '{}': {}", name, e))
        })?;

        if !manifest.tools.contains_key(name) {
            return Err(SahayiError::Toolbox(format!(
                "Manifest does not describe tool '{}'",
                name
            ))
            .into());
        }

        tracing::info!(
            "Loaded toolbox tool '{}' (server version {})",
            name,
            manifest.server_version
        );
        Ok(manifest)
    }

    /// Fetch just the schema of `name`
    ///
    /// # Errors
    ///
    /// See [`ToolboxClient::load_tool`]
    pub async fn tool_schema(&self, name: &str) -> Result<ToolSchema> {
        let mut manifest = self.load_tool(name).await?;
        manifest
            .tools
            .remove(name)
            .ok_or_else(|| SahayiError::Toolbox(format!("Unknown toolbox tool '{}'", name)).into())
    }

    /// Invoke `name` with JSON arguments and return its result text
    ///
    /// String results are returned as-is; other JSON results are
    /// serialized.
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Toolbox` on transport failures, non-success
    /// statuses (carrying the server's `error` message) and malformed bodies
    pub async fn invoke(&self, name: &str, args: &serde_json::Value) -> Result<String> {
        let url = self.endpoint(&format!("api/tool/{}/invoke", name))?;
        tracing::debug!("Invoking toolbox tool '{}'", name);

        let response = self
            .authorize(self.client.post(url))
            .json(args)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Toolbox request for '{}' failed: {}", name, e);
                SahayiError::Toolbox(format!("Failed to invoke tool '{}': {}", name, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Toolbox tool '{}' returned {}", name, status);
            return Err(SahayiError::Toolbox(format!(
                "Tool '{}' returned {}: {}",
                name,
                status,
                error_message(&body)
            ))
            .into());
        }

        let body: InvokeResponse = response.json().await.map_err(|e| {
            SahayiError::Toolbox(format!("Malformed response from '{}': {}", name, e))
        })?;

        Ok(match body.result {
            serde_json::Value::String(text) => text,
            serde_json::Value::Null => "null".to_string(),
            other => other.to_string(),
        })
    }
}

/// Pull the `error` field out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("error") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_trailing_slash() {
        let client = ToolboxClient::new(&ToolboxConfig {
            url: "http://127.0.0.1:5000/toolbox".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://127.0.0.1:5000/toolbox/");
        assert_eq!(
            client.endpoint("api/tool/x").unwrap().as_str(),
            "http://127.0.0.1:5000/toolbox/api/tool/x"
        );
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = ToolboxClient::new(&ToolboxConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = ToolboxClient::new(&ToolboxConfig {
            auth_token: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(client.auth_token.is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message("{\"error\":\"boom\"}"), "boom");
        assert_eq!(error_message("{\"error\":{\"code\":1}}"), "{\"code\":1}");
        assert_eq!(error_message(" plain text "), "plain text");
    }
}
