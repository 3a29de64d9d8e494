//! Emergency service locators
//!
//! A locator takes a confirmed location and returns the nearest police
//! station or medical facility, followed by the fixed reassurance for that
//! service. The guided orchestrator talks to locators through the
//! [`Locator`] trait; [`AgentLocator`] implements it with the locator agents.

use crate::agents::AgentSpec;
use crate::config::AgentConfig;
use crate::error::{Result, SahayiError};
use crate::providers::Provider;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reassurance after police details, when emergency contacts are on file
pub const POLICE_FOLLOW_UP: &str = "Please don't worry, help is on the way. We will also be reaching out to your emergency contacts to let them know you need assistance. They will be informed shortly.";

/// Reassurance after police details when no emergency contacts are on file
pub const POLICE_FOLLOW_UP_NO_PROFILE: &str = "Please don't worry, help is on the way.";

/// Reassurance after medical facility details, when medical history is on
/// file
pub const MEDICAL_FOLLOW_UP: &str = "We will also be sharing your previous medical conditions with them so they can provide you with the best care. They will reach out to you shortly.";

/// Reassurance after medical facility details when no medical history is
/// on file
pub const MEDICAL_FOLLOW_UP_NO_PROFILE: &str =
    "Please don't worry, they will reach out to you shortly.";

/// Emergency service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Police station
    Police,
    /// Hospital, emergency room, urgent care or ambulance service
    Medical,
}

impl ServiceKind {
    /// What the citizen is told we are finding
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::locator::ServiceKind;
    ///
    /// assert_eq!(ServiceKind::Police.facility(), "police station");
    /// assert_eq!(ServiceKind::Medical.facility(), "hospital");
    /// ```
    pub fn facility(&self) -> &'static str {
        match self {
            ServiceKind::Police => "police station",
            ServiceKind::Medical => "hospital",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Police => write!(f, "police"),
            ServiceKind::Medical => write!(f, "medical"),
        }
    }
}

/// The fixed follow-up for `kind`
///
/// `details_on_file` is whether the record the follow-up mentions exists:
/// emergency contacts for police, medical conditions for medical. Without
/// it the follow-up promises nothing.
pub fn follow_up(kind: ServiceKind, details_on_file: bool) -> &'static str {
    match (kind, details_on_file) {
        (ServiceKind::Police, true) => POLICE_FOLLOW_UP,
        (ServiceKind::Police, false) => POLICE_FOLLOW_UP_NO_PROFILE,
        (ServiceKind::Medical, true) => MEDICAL_FOLLOW_UP,
        (ServiceKind::Medical, false) => MEDICAL_FOLLOW_UP_NO_PROFILE,
    }
}

/// Append `follow_up` to `answer` unless it is already there
///
/// # Examples
///
/// ```
/// use sahayi::locator::ensure_follow_up;
///
/// let once = ensure_follow_up("Central Station, 1 km.", "Help is on the way.");
/// assert_eq!(once, "Central Station, 1 km.\n\nHelp is on the way.");
/// assert_eq!(ensure_follow_up(&once, "Help is on the way."), once);
/// ```
pub fn ensure_follow_up(answer: &str, follow_up: &str) -> String {
    let answer = answer.trim();
    if answer.is_empty() {
        return follow_up.to_string();
    }
    if squash(answer).contains(&squash(follow_up)) {
        return answer.to_string();
    }
    format!("{}\n\n{}", answer, follow_up)
}

fn squash(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .to_lowercase()
}

/// A request to locate the nearest service
#[derive(Debug, Clone, PartialEq)]
pub struct LocateRequest {
    /// Which service to find
    pub kind: ServiceKind,
    /// Confirmed location, address or landmark
    pub location: String,
    /// What the citizen said, if anything
    pub request: Option<String>,
    /// Whether emergency contacts are on file
    pub has_contacts: bool,
    /// Whether medical conditions are on file
    pub has_medical_history: bool,
}

impl LocateRequest {
    /// Request for a citizen with no profile details on file
    pub fn anonymous(kind: ServiceKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            request: None,
            has_contacts: false,
            has_medical_history: false,
        }
    }

    /// The follow-up this request is allowed to promise
    pub fn follow_up(&self) -> &'static str {
        let details_on_file = match self.kind {
            ServiceKind::Police => self.has_contacts,
            ServiceKind::Medical => self.has_medical_history,
        };
        follow_up(self.kind, details_on_file)
    }

    /// Prompt handed to the locator agent
    pub fn prompt(&self) -> String {
        let situation = self
            .request
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| format!("The citizen said: \"{}\"", r))
            .unwrap_or_else(|| format!("The citizen needs the nearest {}.", self.kind.facility()));
        format!("Location: {}\n{}", self.location.trim(), situation)
    }
}

/// Finds the nearest service for a confirmed location
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Locator: Send + Sync {
    /// Locate the service and return the text for the citizen, follow-up
    /// included
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Locator` when the service details could not be
    /// produced
    async fn locate(&self, request: &LocateRequest) -> Result<String>;
}

/// Locator backed by the locator agents
pub struct AgentLocator {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl AgentLocator {
    /// Create a locator; `tools` must contain `web_search`
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }
}

#[async_trait]
impl Locator for AgentLocator {
    async fn locate(&self, request: &LocateRequest) -> Result<String> {
        let spec = AgentSpec::locator(request.kind, false);
        tracing::info!(agent = %spec.name, "Locating nearest {}", request.kind.facility());

        let mut agent = spec.build(Arc::clone(&self.provider), &self.tools, self.config.clone())?;
        let answer = agent
            .execute(request.prompt())
            .await
            .map_err(|e| SahayiError::Locator(format!("{} failed: {}", spec.name, e)))?;

        Ok(ensure_follow_up(&answer, request.follow_up()))
    }
}
