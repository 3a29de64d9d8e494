//! Secrets in the OS keyring
//!
//! API keys and the toolbox token can be stored under the keyring service
//! `sahayi` instead of the config file or environment. Values from the file
//! or environment always take precedence.

use crate::config::Config;
use crate::error::{Result, SahayiError};

/// Keyring service name
pub const KEYRING_SERVICE: &str = "sahayi";

/// A secret Sahayi knows how to store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    /// Gemini API key
    GeminiApiKey,
    /// Custom Search API key
    SearchApiKey,
    /// Toolbox bearer token
    ToolboxToken,
}

impl Secret {
    /// Keyring account name for this secret
    pub fn account(&self) -> &'static str {
        match self {
            Secret::GeminiApiKey => "gemini_api_key",
            Secret::SearchApiKey => "search_api_key",
            Secret::ToolboxToken => "toolbox_token",
        }
    }

    /// Prompt shown when asking for the secret
    pub fn prompt(&self) -> &'static str {
        match self {
            Secret::GeminiApiKey => "Gemini API key: ",
            Secret::SearchApiKey => "Custom Search API key: ",
            Secret::ToolboxToken => "Toolbox token: ",
        }
    }
}

fn entry(secret: Secret) -> Result<keyring::Entry> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, secret.account()).map_err(SahayiError::Keyring)?)
}

/// Store `value` for `secret`
///
/// # Errors
///
/// Returns `SahayiError::Config` for a blank value and
/// `SahayiError::Keyring` if the credential store rejects it
pub fn store_secret(secret: Secret, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SahayiError::Config(format!("{} cannot be empty", secret.account())).into());
    }
    entry(secret)?
        .set_password(value)
        .map_err(SahayiError::Keyring)?;
    tracing::info!(account = secret.account(), "Stored secret in keyring");
    Ok(())
}

/// Load the stored value for `secret`
///
/// Returns `Ok(None)` when nothing has been stored.
///
/// # Errors
///
/// Returns `SahayiError::Keyring` if the credential store fails
pub fn load_secret(secret: Secret) -> Result<Option<String>> {
    match entry(secret)?.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(SahayiError::Keyring(e).into()),
    }
}

/// Fill secrets missing from `config` with keyring values
///
/// Keyring failures are logged and ignored; a missing secret is reported
/// later by the component that needs it.
pub fn apply_keyring_secrets(config: &mut Config) {
    let slots = [
        (Secret::GeminiApiKey, &mut config.provider.gemini.api_key),
        (Secret::SearchApiKey, &mut config.search.api_key),
        (Secret::ToolboxToken, &mut config.toolbox.auth_token),
    ];
    for (secret, slot) in slots {
        if slot.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            continue;
        }
        match load_secret(secret) {
            Ok(Some(value)) => {
                tracing::debug!(account = secret.account(), "Using secret from keyring");
                *slot = Some(value);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(account = secret.account(), "Keyring unavailable: {}", e),
        }
    }
}
