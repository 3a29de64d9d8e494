//! Agent definitions for Sahayi
//!
//! An [`AgentSpec`] is the declarative part of an agent: name, description,
//! instruction and the names of the tools it may call. Specs are turned into
//! running [`Agent`]s against a shared provider and tool registry.

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::locator::ServiceKind;
use crate::prompts;
use crate::providers::Provider;
use crate::tools::web_search::WEB_SEARCH_TOOL_NAME;
use crate::tools::{AgentTool, ToolRegistry};
use std::sync::Arc;

/// Name of the police locator agent
pub const POLICE_LOCATOR: &str = "nearest_police_locator";
/// Name of the medical locator agent
pub const MEDICAL_LOCATOR: &str = "nearest_medical_locator";
/// Name of the user profiler agent
pub const USER_PROFILER: &str = "user_profiler_agent";
/// Name of the orchestrator agent
pub const ORCHESTRATOR: &str = "sahayi_agent";

/// Tool name of the user profiler inside the orchestrator
pub const USER_TOOL: &str = "user_tool";
/// Tool name of the police locator inside the orchestrator
pub const POLICE_TOOL: &str = "police_tool";
/// Tool name of the medical locator inside the orchestrator
pub const MEDICAL_TOOL: &str = "medical_tool";

/// Declarative agent definition
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    /// Agent name
    pub name: String,
    /// What the agent does; also used as its tool description
    pub description: String,
    /// System instruction
    pub instruction: String,
    /// Names of the tools the agent may call
    pub tools: Vec<String>,
}

impl AgentSpec {
    /// Locator agent for `kind`
    pub fn locator(kind: ServiceKind, include_follow_up: bool) -> Self {
        let (name, description) = match kind {
            ServiceKind::Police => (POLICE_LOCATOR, prompts::POLICE_LOCATOR_DESCRIPTION),
            ServiceKind::Medical => (MEDICAL_LOCATOR, prompts::MEDICAL_LOCATOR_DESCRIPTION),
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instruction: prompts::locator_instruction(kind, include_follow_up),
            tools: vec![WEB_SEARCH_TOOL_NAME.to_string()],
        }
    }

    /// `nearest_police_locator`
    pub fn police_locator(include_follow_up: bool) -> Self {
        Self::locator(ServiceKind::Police, include_follow_up)
    }

    /// `nearest_medical_locator`
    pub fn medical_locator(include_follow_up: bool) -> Self {
        Self::locator(ServiceKind::Medical, include_follow_up)
    }

    /// `user_profiler_agent`, calling the toolbox tool `contact_tool`
    pub fn user_profiler(contact_tool: &str) -> Self {
        Self {
            name: USER_PROFILER.to_string(),
            description: prompts::USER_PROFILER_DESCRIPTION.to_string(),
            instruction: prompts::user_profiler_instruction(contact_tool),
            tools: vec![contact_tool.to_string()],
        }
    }

    /// `sahayi_agent`, the LLM-led orchestrator
    pub fn orchestrator() -> Self {
        Self {
            name: ORCHESTRATOR.to_string(),
            description: prompts::ORCHESTRATOR_DESCRIPTION.to_string(),
            instruction: prompts::ORCHESTRATOR_INSTRUCTION.to_string(),
            tools: vec![
                USER_TOOL.to_string(),
                POLICE_TOOL.to_string(),
                MEDICAL_TOOL.to_string(),
            ],
        }
    }

    /// Build a running agent from this spec
    ///
    /// `registry` may hold more tools than `self.tools` lists; only the listed
    /// ones are handed to the agent.
    ///
    /// # Errors
    ///
    /// Returns `SahayiError::Config` if a named tool is missing from
    /// `registry` or the agent configuration is invalid
    pub fn build(
        &self,
        provider: Arc<dyn Provider>,
        registry: &ToolRegistry,
        config: AgentConfig,
    ) -> Result<Agent> {
        let tools = registry.filtered(&self.tools)?;
        tracing::debug!(agent = %self.name, tools = ?self.tools, "Building agent");
        Ok(Agent::from_shared(provider, tools, config)?.with_system_prompt(&self.instruction))
    }
}

/// Build the assistant-mode orchestrator
///
/// `base_tools` must contain `web_search` and the contact lookup tool; the
/// three sub-agents are wrapped as `user_tool`, `police_tool` and
/// `medical_tool`.
///
/// # Errors
///
/// Returns `SahayiError::Config` if a required tool is missing
pub fn assistant_orchestrator(
    provider: Arc<dyn Provider>,
    base_tools: &ToolRegistry,
    contact_tool: &str,
    config: AgentConfig,
) -> Result<Agent> {
    let user_spec = AgentSpec::user_profiler(contact_tool);
    let police_spec = AgentSpec::police_locator(true);
    let medical_spec = AgentSpec::medical_locator(true);

    // Fail at startup rather than on the first delegated request
    for spec in [&user_spec, &police_spec, &medical_spec] {
        base_tools.filtered(&spec.tools)?;
    }

    let mut registry = ToolRegistry::new();
    for (tool_name, spec) in [
        (USER_TOOL, user_spec),
        (POLICE_TOOL, police_spec),
        (MEDICAL_TOOL, medical_spec),
    ] {
        registry.register(
            tool_name,
            Arc::new(AgentTool::new(
                tool_name,
                spec,
                Arc::clone(&provider),
                base_tools.clone(),
                config.clone(),
            )),
        );
    }

    AgentSpec::orchestrator().build(provider, &registry, config)
}
