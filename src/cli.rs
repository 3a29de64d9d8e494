//! Command-line interface definition for Sahayi
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, profile lookup, service
//! location, intent classification, and credential storage.

use clap::{Parser, Subcommand, ValueEnum};

/// Sahayi - emergency helper for senior citizens
#[derive(Parser, Debug, Clone)]
#[command(name = "sahayi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "SAHAYI_CONFIG", default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive helper session
    Chat {
        /// Orchestration mode (guided or assistant)
        #[arg(short, long)]
        mode: Option<String>,

        /// Provider to use (gemini or ollama)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Look up a citizen's profile by name
    Lookup {
        /// Name to search for
        #[arg(short, long)]
        name: String,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the nearest police station or medical facility
    Locate {
        /// Service to locate
        #[arg(short, long, value_enum)]
        service: ServiceArg,

        /// Location, address, or landmark
        #[arg(short, long)]
        location: String,

        /// What the citizen said, passed to the locator as context
        #[arg(short, long)]
        request: Option<String>,

        /// Provider to use (gemini or ollama)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Show how a message would be routed
    Classify {
        /// Message to classify
        #[arg(short, long)]
        message: String,

        /// Ask the LLM when keywords do not decide
        #[arg(long)]
        llm: bool,
    },

    /// Store a secret in the OS keyring
    Auth {
        /// Which secret to store
        #[arg(short, long, value_enum)]
        service: SecretArg,
    },
}

/// Service selection for `locate`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceArg {
    /// Nearest police station
    Police,
    /// Nearest hospital, clinic or ambulance service
    Medical,
}

/// Secret selection for `auth`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretArg {
    /// Gemini API key
    Gemini,
    /// Custom Search API key
    Search,
    /// Toolbox bearer token
    Toolbox,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Chat {
                mode: None,
                provider: None,
            },
        }
    }
}
