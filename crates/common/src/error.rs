//! Common error types for Runnerq

use thiserror::Error;

/// Environment configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Process initialization errors. Fatal: no partially initialized runtime
/// is ever handed out.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Credential error: {0}")]
    Credentials(String),
}
