//! Error types for Sahayi
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Sahayi operations
///
/// Covers configuration loading, provider interactions, tool execution,
/// the remote toolbox and search services, and the session orchestrator.
#[derive(Error, Debug)]
pub enum SahayiError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Remote toolbox errors (manifest loading, invocation)
    #[error("Toolbox error: {0}")]
    Toolbox(String),

    /// Web search errors
    #[error("Search error: {0}")]
    Search(String),

    /// Profile lookup errors (unparseable contact records)
    #[error("Profile lookup error: {0}")]
    Lookup(String),

    /// Locator agent errors
    #[error("Locator error: {0}")]
    Locator(String),

    /// Agent exceeded maximum iteration limit
    #[error("Agent exceeded maximum iterations: limit={limit}, {message}")]
    MaxIterationsExceeded {
        /// The configured iteration limit
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// Missing credentials for a remote service
    #[error("Missing credentials for: {0}")]
    MissingCredentials(String),

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Sahayi operations
///
/// Uses `anyhow::Error` so callers can attach context while the
/// domain variants above stay downcastable.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = SahayiError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_toolbox_error_display() {
        let error = SahayiError::Toolbox("tool not found".to_string());
        assert_eq!(error.to_string(), "Toolbox error: tool not found");
    }

    #[test]
    fn test_lookup_error_display() {
        let error = SahayiError::Lookup("bad row".to_string());
        assert_eq!(error.to_string(), "Profile lookup error: bad row");
    }

    #[test]
    fn test_locator_error_display() {
        let error = SahayiError::Locator("no provider".to_string());
        assert_eq!(error.to_string(), "Locator error: no provider");
    }

    #[test]
    fn test_max_iterations_error_display() {
        let error = SahayiError::MaxIterationsExceeded {
            limit: 10,
            message: "stuck in loop".to_string(),
        };
        assert!(error.to_string().contains("limit=10"));
        assert!(error.to_string().contains("stuck in loop"));
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = SahayiError::MissingCredentials("gemini".to_string());
        assert_eq!(error.to_string(), "Missing credentials for: gemini");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: SahayiError = json_error.into();
        assert!(matches!(error, SahayiError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: SahayiError = yaml_error.into();
        assert!(matches!(error, SahayiError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SahayiError>();
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = SahayiError::Search("quota".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<SahayiError>(),
            Some(SahayiError::Search(_))
        ));
    }
}
