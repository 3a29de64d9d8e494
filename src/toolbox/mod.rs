//! Remote toolbox support
//!
//! The toolbox is an HTTP service that hosts named tools (most importantly
//! `search-contact-by-name`). This module holds the wire types and the
//! client that loads tool manifests and invokes tools.

pub mod client;

pub use client::ToolboxClient;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Manifest returned by `GET /api/tool/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolManifest {
    /// Version of the toolbox server
    #[serde(rename = "serverVersion", default)]
    pub server_version: String,

    /// Tool schemas keyed by tool name
    #[serde(default)]
    pub tools: HashMap<String, ToolSchema>,
}

/// Schema of a single toolbox tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Declared parameters, in order
    #[serde(default)]
    pub parameters: Vec<ParameterSchema>,

    /// Auth services the tool requires, if any
    #[serde(rename = "authRequired", default)]
    pub auth_required: Vec<String>,
}

/// Schema of a toolbox tool parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// Parameter type (`string`, `integer`, `float`, `boolean`, `array`)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Whether the parameter must be supplied; defaults to required
    #[serde(default)]
    pub required: Option<bool>,

    /// Element schema for array parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
}

impl ParameterSchema {
    /// JSON schema fragment for this parameter
    pub fn json_schema(&self) -> serde_json::Value {
        let json_type = match self.param_type.as_str() {
            "float" => "number",
            other => other,
        };
        let mut schema = serde_json::json!({
            "type": json_type,
            "description": self.description,
        });
        if json_type == "array" {
            schema["items"] = self
                .items
                .as_ref()
                .map(|items| items.json_schema())
                .unwrap_or_else(|| serde_json::json!({"type": "string"}));
        }
        schema
    }

    /// Whether the parameter is required
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(true)
    }
}

impl ToolSchema {
    /// JSON schema object describing the tool's arguments
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::toolbox::{ParameterSchema, ToolSchema};
    ///
    /// let schema = ToolSchema {
    ///     description: "Find a contact".to_string(),
    ///     parameters: vec![ParameterSchema {
    ///         name: "name".to_string(),
    ///         param_type: "string".to_string(),
    ///         description: "Full name".to_string(),
    ///         required: None,
    ///         items: None,
    ///     }],
    ///     auth_required: vec![],
    /// };
    /// let json = schema.parameters_schema();
    /// assert_eq!(json["required"][0], "name");
    /// ```
    pub fn parameters_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
