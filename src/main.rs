//! Sahayi - emergency helper for senior citizens
//!
#![doc = "Sahayi - emergency helper for senior citizens"]
#![doc = "Main entry point for the Sahayi application."]

use anyhow::Result;
use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sahayi::cli::{Cli, Commands};
use sahayi::commands;
use sahayi::config::Config;
use sahayi::credentials;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; logging settings come from it
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let mut config = Config::load(config_path, &cli)?;

    init_tracing(cli.verbose, config.logging.json);
    if !Path::new(config_path).exists() {
        tracing::warn!("Config file not found at {}, using defaults", config_path);
    }

    let needs_secrets = match &cli.command {
        Commands::Auth { .. } => false,
        Commands::Classify { llm, .. } => *llm,
        _ => true,
    };
    if needs_secrets {
        credentials::apply_keyring_secrets(&mut config);
    }

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Chat { mode, provider } => {
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }
            commands::chat::run_chat(config, mode, provider).await?;
            Ok(())
        }
        Commands::Lookup { name, json } => {
            tracing::info!("Looking up profile");
            commands::lookup::run_lookup(config, name, json).await?;
            Ok(())
        }
        Commands::Locate {
            service,
            location,
            request,
            provider,
        } => {
            tracing::info!(?service, "Locating nearest service");
            commands::locate::run_locate(config, service, location, request, provider).await?;
            Ok(())
        }
        Commands::Classify { message, llm } => {
            commands::classify::run_classify(config, message, llm).await?;
            Ok(())
        }
        Commands::Auth { service } => {
            tracing::info!(?service, "Storing secret");
            commands::auth::run_auth(service)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "sahayi=debug" } else { "sahayi=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
