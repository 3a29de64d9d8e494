//! Citizen profiles and the contact lookup
//!
//! Profiles come from the remote toolbox's contact lookup tool. The row
//! schema belongs to that service, so field names are matched through
//! common aliases and any extra columns are kept verbatim.

use crate::config::ToolboxConfig;
use crate::error::{Result, SahayiError};
use crate::toolbox::{ToolSchema, ToolboxClient};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

/// Argument name used when the manifest cannot be read
const DEFAULT_NAME_ARGUMENT: &str = "name";

/// A citizen's contact record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Full name as stored
    #[serde(default, alias = "full_name", alias = "contact_name", alias = "Name")]
    pub name: String,

    /// Home address, when on file
    #[serde(
        default,
        alias = "address",
        alias = "homeAddress",
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub home_address: Option<String>,

    /// Emergency contacts in whatever shape the service stores them
    #[serde(
        default,
        alias = "emergencyContacts",
        alias = "emergency_contact",
        alias = "contacts",
        deserialize_with = "flexible_list"
    )]
    pub emergency_contacts: Vec<Value>,

    /// Known medical conditions
    #[serde(
        default,
        alias = "medicalConditions",
        alias = "conditions",
        alias = "medical_history",
        deserialize_with = "string_list"
    )]
    pub medical_conditions: Vec<String>,

    /// Remaining columns, unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UserProfile {
    /// Human-readable summary of the profile
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::profile::UserProfile;
    ///
    /// let profile = UserProfile {
    ///     name: "John Smith".to_string(),
    ///     home_address: Some("12 Elm St".to_string()),
    ///     ..Default::default()
    /// };
    /// assert!(profile.describe().contains("Home address: 12 Elm St"));
    /// ```
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("Name: {}", self.name)];
        lines.push(format!(
            "Home address: {}",
            self.home_address.as_deref().unwrap_or("not on file")
        ));
        if self.emergency_contacts.is_empty() {
            lines.push("Emergency contacts: none on file".to_string());
        } else {
            let contacts: Vec<String> = self
                .emergency_contacts
                .iter()
                .map(|c| match c {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            lines.push(format!("Emergency contacts: {}", contacts.join("; ")));
        }
        if self.medical_conditions.is_empty() {
            lines.push("Medical conditions: none on file".to_string());
        } else {
            lines.push(format!(
                "Medical conditions: {}",
                self.medical_conditions.join(", ")
            ));
        }
        lines.join("\n")
    }

    /// True when at least one emergency contact is on file
    pub fn has_contacts(&self) -> bool {
        self.emergency_contacts.iter().any(|c| match c {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    /// True when at least one medical condition is on file
    pub fn has_medical_history(&self) -> bool {
        self.medical_conditions.iter().any(|c| !c.trim().is_empty())
    }
}

/// Result of a profile lookup
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// A matching record exists
    Found(UserProfile),
    /// No record for that name
    NotFound,
}

impl LookupOutcome {
    /// The profile, if one was found
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            LookupOutcome::Found(profile) => Some(profile),
            LookupOutcome::NotFound => None,
        }
    }
}

/// Looks up a citizen's profile by name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Look up `name`
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Toolbox` when the service cannot be reached
    /// and `SahayiError::Lookup` when its answer cannot be understood
    async fn lookup(&self, name: &str) -> Result<LookupOutcome>;
}

/// Profile lookup through the toolbox contact tool
///
/// The argument carrying the name is read from the tool's manifest on the
/// first lookup and reused afterwards.
pub struct ToolboxProfileLookup {
    client: ToolboxClient,
    tool_name: String,
    name_argument: OnceCell<String>,
}

impl ToolboxProfileLookup {
    /// Create a lookup using the configured toolbox and contact tool
    ///
    /// # Errors
    ///
    /// Returns error if the toolbox client cannot be created
    pub fn new(config: &ToolboxConfig) -> Result<Self> {
        Ok(Self::with_client(
            ToolboxClient::new(config)?,
            config.contact_tool.clone(),
        ))
    }

    /// Create a lookup from an existing client
    pub fn with_client(client: ToolboxClient, tool_name: impl Into<String>) -> Self {
        Self {
            client,
            tool_name: tool_name.into(),
            name_argument: OnceCell::new(),
        }
    }

    async fn name_argument(&self) -> String {
        let resolved = self
            .name_argument
            .get_or_try_init(|| async {
                let manifest = self.client.load_tool(&self.tool_name).await?;
                let argument = manifest
                    .tools
                    .get(&self.tool_name)
                    .and_then(name_parameter)
                    .unwrap_or_else(|| DEFAULT_NAME_ARGUMENT.to_string());
                tracing::debug!("Contact tool takes the name as '{}'", argument);
                Ok::<_, anyhow::Error>(argument)
            })
            .await;

        match resolved {
            Ok(argument) => argument.clone(),
            Err(e) => {
                tracing::warn!(
                    "Could not read the '{}' manifest, sending '{}': {}",
                    self.tool_name,
                    DEFAULT_NAME_ARGUMENT,
                    e
                );
                DEFAULT_NAME_ARGUMENT.to_string()
            }
        }
    }
}

/// First string parameter of the contact tool, required ones first
fn name_parameter(schema: &ToolSchema) -> Option<String> {
    schema
        .parameters
        .iter()
        .filter(|p| p.param_type == "string")
        .min_by_key(|p| !p.is_required())
        .map(|p| p.name.clone())
}

#[async_trait]
impl ProfileLookup for ToolboxProfileLookup {
    async fn lookup(&self, name: &str) -> Result<LookupOutcome> {
        let mut args = serde_json::Map::new();
        args.insert(self.name_argument().await, Value::String(name.to_string()));
        let raw = self
            .client
            .invoke(&self.tool_name, &Value::Object(args))
            .await?;
        let rows = parse_rows(&raw)?;
        tracing::debug!("Contact lookup returned {} rows", rows.len());
        Ok(select_profile(name, rows))
    }
}

/// Parse the contact tool's result text into profiles
///
/// Accepts a JSON array of rows, a single row object, `null`, an empty
/// string, or any of those encoded once more as a JSON string.
///
/// # Errors
///
/// Returns `SahayiError::Lookup` for anything else
pub fn parse_rows(raw: &str) -> Result<Vec<UserProfile>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| SahayiError::Lookup(format!("Contact lookup returned non-JSON data: {}", e)))?;
    rows_from_value(value)
}

fn rows_from_value(value: Value) -> Result<Vec<UserProfile>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(inner) => parse_rows(&inner),
        Value::Object(_) => Ok(vec![profile_from_value(value)?]),
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(profile_from_value)
            .collect(),
        other => Err(SahayiError::Lookup(format!(
            "Unexpected contact lookup result: {}",
            other
        ))
        .into()),
    }
}

fn profile_from_value(value: Value) -> Result<UserProfile> {
    serde_json::from_value(value)
        .map_err(|e| SahayiError::Lookup(format!("Malformed contact record: {}", e)).into())
}

/// Pick the profile for `name` among the returned rows
///
/// An exact match (case-insensitive, whitespace-normalised) wins; otherwise
/// the first row in service order.
pub fn select_profile(name: &str, rows: Vec<UserProfile>) -> LookupOutcome {
    let wanted = normalize_name(name);
    let exact = rows.iter().position(|p| normalize_name(&p.name) == wanted);

    match exact {
        Some(idx) => LookupOutcome::Found(rows.into_iter().nth(idx).unwrap_or_default()),
        None => rows
            .into_iter()
            .next()
            .map(LookupOutcome::Found)
            .unwrap_or(LookupOutcome::NotFound),
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn non_empty_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn flexible_list<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Vec::new()
            } else {
                match serde_json::from_str::<Value>(s) {
                    Ok(Value::Array(items)) => items,
                    Ok(Value::Object(obj)) => vec![Value::Object(obj)],
                    _ => vec![Value::String(s.to_string())],
                }
            }
        }
        Some(other) => vec![other],
    })
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = flexible_list(deserializer)?;
    Ok(values
        .into_iter()
        .flat_map(|v| match v {
            Value::String(s) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>(),
            other => vec![other.to_string()],
        })
        .collect())
}
