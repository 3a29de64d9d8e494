//! Sahayi - emergency helper for senior citizens
//!
//! This library routes a senior citizen's message to a police locator, a
//! medical locator or a profile lookup, through either a deterministic
//! session state machine (guided mode) or an LLM orchestrator agent
//! (assistant mode).
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `agent`: Agent runtime, conversation management, and execution loop
//! - `agents`: Agent definitions (locators, profiler, orchestrator)
//! - `providers`: LLM provider abstraction and implementations (Gemini, Ollama)
//! - `tools`: Tool registry, web search, toolbox tools and agent tools
//! - `toolbox`: Client for the remote tool-hosting service
//! - `profile`: Citizen profiles and the contact lookup
//! - `locator`: Nearest-service locators and their follow-ups
//! - `routing`: Intent classification
//! - `session`: Guided session state machine
//! - `config`: Configuration management and validation
//! - `credentials`: Secrets in the OS keyring
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use sahayi::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod agents;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod locator;
pub mod profile;
pub mod prompts;
pub mod providers;
pub mod routing;
pub mod session;
pub mod toolbox;
pub mod tools;

// Re-export commonly used types
pub use agent::Agent;
pub use config::Config;
pub use error::{Result, SahayiError};
pub use locator::ServiceKind;
pub use routing::Intent;
pub use session::{Orchestrator, Reply, SessionState};
