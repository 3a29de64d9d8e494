//! Toolbox-hosted tools exposed to agents
//!
//! A `ToolboxTool` is loaded by name from the remote toolbox; its definition
//! comes from the toolbox manifest and `execute` forwards to the toolbox
//! invoke endpoint.

use crate::error::Result;
use crate::toolbox::{ToolSchema, ToolboxClient};
use crate::tools::{Tool, ToolExecutor, ToolResult};
use async_trait::async_trait;

/// A tool hosted by the remote toolbox
pub struct ToolboxTool {
    name: String,
    schema: ToolSchema,
    client: ToolboxClient,
}

impl ToolboxTool {
    /// Load `name` from the toolbox
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Toolbox` if the manifest cannot be fetched
    pub async fn load(client: ToolboxClient, name: &str) -> Result<Self> {
        let schema = client.tool_schema(name).await?;
        Ok(Self::from_schema(client, name, schema))
    }

    /// Build a tool from an already known schema
    pub fn from_schema(client: ToolboxClient, name: impl Into<String>, schema: ToolSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            client,
        }
    }

    /// Name of the toolbox tool
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ToolExecutor for ToolboxTool {
    fn tool_definition(&self) -> serde_json::Value {
        Tool::new(
            self.name.clone(),
            self.schema.description.clone(),
            self.schema.parameters_schema(),
        )
        .to_value()
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        if !args.is_object() {
            return Ok(ToolResult::error(format!(
                "Arguments for '{}' must be a JSON object",
                self.name
            )));
        }

        let missing: Vec<&str> = self
            .schema
            .parameters
            .iter()
            .filter(|p| p.is_required() && args.get(&p.name).map_or(true, |v| v.is_null()))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Ok(ToolResult::error(format!(
                "Missing required parameters for '{}': {}",
                self.name,
                missing.join(", ")
            )));
        }

        match self.client.invoke(&self.name, &args).await {
            Ok(output) => Ok(ToolResult::success(output).with_metadata("toolbox_tool", &self.name)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolboxConfig;
    use crate::toolbox::ParameterSchema;

    fn tool() -> ToolboxTool {
        let schema = ToolSchema {
            description: "Search contacts by name".to_string(),
            parameters: vec![ParameterSchema {
                name: "name".to_string(),
                param_type: "string".to_string(),
                description: "Name to search".to_string(),
                required: None,
                items: None,
            }],
            auth_required: vec![],
        };
        let client = ToolboxClient::new(&ToolboxConfig::default()).unwrap();
        ToolboxTool::from_schema(client, "search-contact-by-name", schema)
    }

    #[test]
    fn test_definition_from_manifest() {
        let definition = tool().tool_definition();
        assert_eq!(definition["name"], "search-contact-by-name");
        assert_eq!(definition["description"], "Search contacts by name");
        assert_eq!(definition["parameters"]["properties"]["name"]["type"], "string");
    }

    #[tokio::test]
    async fn test_execute_reports_missing_parameters() {
        let result = tool().execute(serde_json::json!({})).await.unwrap();
        assert!(!result.success);
        assert!(result.to_message().contains("name"));
    }

    #[tokio::test]
    async fn test_execute_rejects_non_object() {
        let result = tool().execute(serde_json::json!("John")).await.unwrap();
        assert!(!result.success);
    }
}
