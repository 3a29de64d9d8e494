/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`: Interactive helper session (guided or assistant mode)
- `lookup`: Profile lookup only
- `locate`: Run a locator agent once
- `classify`: Show how a message would be routed
- `auth`: Store a secret in the OS keyring

Handlers wire configuration into providers, tools and the orchestrators.
*/

use crate::config::{ClassifierKind, Config};
use crate::error::Result;
use crate::providers::{create_provider_with_override, Provider};
use crate::routing::{IntentClassifier, KeywordClassifier, LlmClassifier};
use crate::toolbox::ToolboxClient;
use crate::tools::web_search::WEB_SEARCH_TOOL_NAME;
use crate::tools::{ToolRegistry, ToolboxTool, WebSearchTool};
use std::sync::Arc;

/// Create the configured provider, honouring a `--provider` override
///
/// # Errors
///
/// Returns error if the provider type is unknown or its credentials are
/// missing
pub fn build_provider(config: &Config, provider_override: Option<&str>) -> Result<Arc<dyn Provider>> {
    let provider = create_provider_with_override(&config.provider, provider_override, None)?;
    tracing::debug!(model = %provider.model_name(), "Provider ready");
    Ok(Arc::from(provider))
}

/// Registry holding only `web_search`, used by the locator agents
///
/// # Errors
///
/// Returns `SahayiError::MissingCredentials` if the search API key or
/// engine id is not configured
pub fn build_search_tools(config: &Config) -> Result<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(
        WEB_SEARCH_TOOL_NAME,
        Arc::new(WebSearchTool::new(config.search.clone())?),
    );
    Ok(tools)
}

/// Registry holding `web_search` and the toolbox contact lookup tool
///
/// # Errors
///
/// Returns error if search credentials are missing or the toolbox manifest
/// cannot be loaded
pub async fn build_base_tools(config: &Config) -> Result<ToolRegistry> {
    let mut tools = build_search_tools(config)?;
    let client = ToolboxClient::new(&config.toolbox)?;
    let contact_tool = ToolboxTool::load(client, &config.toolbox.contact_tool).await?;
    tracing::info!(tool = %contact_tool.name(), "Loaded toolbox tool");
    tools.register(config.toolbox.contact_tool.clone(), Arc::new(contact_tool));
    Ok(tools)
}

/// Create the classifier selected by configuration
///
/// `provider` is required only for the LLM classifier.
///
/// # Errors
///
/// Returns error if the keyword patterns fail to compile
pub fn build_classifier(
    kind: ClassifierKind,
    provider: Option<Arc<dyn Provider>>,
) -> Result<Arc<dyn IntentClassifier>> {
    let keywords = KeywordClassifier::new()?;
    match (kind, provider) {
        (ClassifierKind::Llm, Some(provider)) => Ok(Arc::new(LlmClassifier::new(provider, keywords))),
        (ClassifierKind::Llm, None) => {
            tracing::warn!("LLM classifier requested without a provider, using keywords");
            Ok(Arc::new(keywords))
        }
        (ClassifierKind::Keyword, _) => Ok(Arc::new(keywords)),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive helper session.
    //!
    //! Guided mode drives the conversation with the session state machine;
    //! assistant mode hands every line to the LLM orchestrator agent.

    use super::*;
    use crate::agents::assistant_orchestrator;
    use crate::config::SessionMode;
    use crate::locator::AgentLocator;
    use crate::profile::ToolboxProfileLookup;
    use crate::session::Orchestrator;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start an interactive session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `mode` - Optional override for the session mode ("guided" or "assistant")
    /// * `provider_name` - Optional override for the configured provider
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator cannot be created
    pub async fn run_chat(
        config: Config,
        mode: Option<String>,
        provider_name: Option<String>,
    ) -> Result<()> {
        let mode = match mode.as_deref() {
            Some(m) => SessionMode::parse_str(m)?,
            None => config.session.mode,
        };
        tracing::info!(?mode, "Starting helper session");

        let provider = build_provider(&config, provider_name.as_deref())?;
        match mode {
            SessionMode::Guided => run_guided(config, provider).await,
            SessionMode::Assistant => run_assistant(config, provider).await,
        }
    }

    async fn run_guided(config: Config, provider: Arc<dyn Provider>) -> Result<()> {
        let locator = AgentLocator::new(
            Arc::clone(&provider),
            build_search_tools(&config)?,
            config.agent.clone(),
        );
        let lookup = ToolboxProfileLookup::new(&config.toolbox)?;
        let classifier = build_classifier(config.session.classifier, Some(provider))?;
        let mut session = Orchestrator::new(
            Arc::new(lookup),
            Arc::new(locator),
            classifier,
            config.session.emergency_number.clone(),
        )?;

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner("guided");
        print_reply(&session.greet().text);

        loop {
            match rl.readline(&prompt()) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if is_exit(trimmed) {
                        break;
                    }
                    if !trimmed.is_empty() {
                        rl.add_history_entry(trimmed)?;
                    }
                    let reply = session.handle(trimmed).await;
                    if let Some(service) = reply.routed {
                        tracing::debug!(%service, "Request routed");
                    }
                    print_reply(&reply.text);
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Take care. Goodbye!");
        Ok(())
    }

    async fn run_assistant(config: Config, provider: Arc<dyn Provider>) -> Result<()> {
        let base_tools = build_base_tools(&config).await?;
        let mut agent = assistant_orchestrator(
            provider,
            &base_tools,
            &config.toolbox.contact_tool,
            config.agent.clone(),
        )?;

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner("assistant");

        loop {
            match rl.readline(&prompt()) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if is_exit(trimmed) {
                        break;
                    }
                    rl.add_history_entry(trimmed)?;

                    match agent.execute(trimmed).await {
                        Ok(response) => print_reply(&response),
                        Err(e) => {
                            tracing::error!("Orchestrator failed: {}", e);
                            eprintln!(
                                "{}\n",
                                format!(
                                    "Sorry, something went wrong. If this is an emergency, please call {}.",
                                    config.session.emergency_number
                                )
                                .red()
                            );
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Take care. Goodbye!");
        Ok(())
    }

    fn is_exit(line: &str) -> bool {
        matches!(line.to_lowercase().as_str(), "exit" | "quit" | "/exit" | "/quit")
    }

    fn prompt() -> String {
        format!("{} ", "you>".cyan().bold())
    }

    fn print_reply(text: &str) {
        println!("\n{} {}\n", "sahayi>".green().bold(), text);
    }

    fn print_welcome_banner(mode: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Sahayi - your emergency helper                  ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Mode: {}", mode.yellow());
        println!("Type 'exit' to quit\n");
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_is_exit() {
            assert!(is_exit("exit"));
            assert!(is_exit("QUIT"));
            assert!(!is_exit("I want to exit the building"));
        }
    }
}

// Lookup command handler
pub mod lookup {
    //! One-off profile lookup.

    use super::*;
    use crate::profile::{LookupOutcome, ProfileLookup, ToolboxProfileLookup};
    use colored::Colorize;

    /// Look up `name` and print the profile
    ///
    /// # Errors
    ///
    /// Returns error if the toolbox cannot be reached or its answer cannot
    /// be parsed
    pub async fn run_lookup(config: Config, name: String, json: bool) -> Result<()> {
        let lookup = ToolboxProfileLookup::new(&config.toolbox)?;
        let outcome = lookup.lookup(&name).await?;
        println!("{}", render(&name, &outcome, json)?);
        Ok(())
    }

    pub(crate) fn render(name: &str, outcome: &LookupOutcome, json: bool) -> Result<String> {
        match (outcome, json) {
            (LookupOutcome::Found(profile), true) => Ok(serde_json::to_string_pretty(profile)?),
            (LookupOutcome::NotFound, true) => Ok(serde_json::json!({ "found": false, "name": name })
                .to_string()),
            (LookupOutcome::Found(profile), false) => Ok(profile.describe()),
            (LookupOutcome::NotFound, false) => {
                Ok(format!("{} is not in the system.", name).yellow().to_string())
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::profile::UserProfile;

        #[test]
        fn test_render_found_json() {
            let outcome = LookupOutcome::Found(UserProfile {
                name: "John Smith".to_string(),
                home_address: Some("12 Elm St".to_string()),
                ..Default::default()
            });
            let text = render("John Smith", &outcome, true).unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["home_address"], "12 Elm St");
        }

        #[test]
        fn test_render_not_found() {
            let text = render("Nobody", &LookupOutcome::NotFound, true).unwrap();
            assert!(text.contains("\"found\":false"));
            colored::control::set_override(false);
            let text = render("Nobody", &LookupOutcome::NotFound, false).unwrap();
            assert_eq!(text, "Nobody is not in the system.");
        }
    }
}

// Locate command handler
pub mod locate {
    //! Run a locator agent once.

    use super::*;
    use crate::cli::ServiceArg;
    use crate::locator::{AgentLocator, LocateRequest, Locator, ServiceKind};

    impl From<ServiceArg> for ServiceKind {
        fn from(arg: ServiceArg) -> Self {
            match arg {
                ServiceArg::Police => ServiceKind::Police,
                ServiceArg::Medical => ServiceKind::Medical,
            }
        }
    }

    /// Locate the nearest service for `location` and print it
    ///
    /// The follow-up assumes no profile, since none was looked up.
    ///
    /// # Errors
    ///
    /// Returns error if the provider or search tool cannot be created or
    /// the locator fails
    pub async fn run_locate(
        config: Config,
        service: ServiceArg,
        location: String,
        request: Option<String>,
        provider_name: Option<String>,
    ) -> Result<()> {
        let provider = build_provider(&config, provider_name.as_deref())?;
        let locator = AgentLocator::new(provider, build_search_tools(&config)?, config.agent.clone());
        let answer = locator
            .locate(&LocateRequest {
                request,
                ..LocateRequest::anonymous(service.into(), location)
            })
            .await?;
        println!("{}", answer);
        Ok(())
    }
}

// Classify command handler
pub mod classify {
    //! Show routing for a single message.

    use super::*;
    use crate::agents::{MEDICAL_LOCATOR, POLICE_LOCATOR};
    use crate::routing::Intent;
    use colored::Colorize;

    /// Classify `message` and print the intent and its route
    ///
    /// # Errors
    ///
    /// Returns error if `llm` is set and no provider can be created
    pub async fn run_classify(config: Config, message: String, llm: bool) -> Result<()> {
        let classifier = if llm {
            let provider = build_provider(&config, None)?;
            build_classifier(ClassifierKind::Llm, Some(provider))?
        } else {
            build_classifier(ClassifierKind::Keyword, None)?
        };

        let intent = classifier.classify(&message).await;
        println!("{}", intent.to_string().bold());
        println!("{}", route_description(intent));
        Ok(())
    }

    pub(crate) fn route_description(intent: Intent) -> String {
        match intent {
            Intent::Police => format!("route: {}", POLICE_LOCATOR),
            Intent::Medical => format!("route: {}", MEDICAL_LOCATOR),
            Intent::General => "route: none (request acknowledged, support coming soon)".to_string(),
            Intent::Unknown => "route: none (ask how to help)".to_string(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_route_description() {
            assert_eq!(route_description(Intent::Medical), "route: nearest_medical_locator");
            assert!(route_description(Intent::General).contains("none"));
        }
    }
}

// Auth command handler
pub mod auth {
    //! Store secrets in the OS keyring.

    use super::*;
    use crate::cli::SecretArg;
    use crate::credentials::{store_secret, Secret};
    use rustyline::DefaultEditor;

    impl From<SecretArg> for Secret {
        fn from(arg: SecretArg) -> Self {
            match arg {
                SecretArg::Gemini => Secret::GeminiApiKey,
                SecretArg::Search => Secret::SearchApiKey,
                SecretArg::Toolbox => Secret::ToolboxToken,
            }
        }
    }

    /// Prompt for a secret and store it
    ///
    /// # Errors
    ///
    /// Returns error if input cannot be read or the keyring rejects the
    /// value
    pub fn run_auth(service: SecretArg) -> Result<()> {
        let secret = Secret::from(service);
        let mut rl = DefaultEditor::new()?;
        let value = rl.readline(secret.prompt())?;
        store_secret(secret, &value)?;
        println!("Stored {} in the keyring.", secret.account());
        Ok(())
    }
}
