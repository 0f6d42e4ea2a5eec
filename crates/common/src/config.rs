//! Configuration management following 12-factor app principles
//!
//! All process configuration is loaded from environment variables. Queue
//! settings live with the queue store (`runnerq_sqs::QueueConfig`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::init::InitConfig;

pub const DEFAULT_ASSET_SOURCE: &str = "./shoes-ecs-task";
pub const DEFAULT_ASSET_DEST: &str = "/tmp/shoes-ecs-task";

#[derive(Clone)]
pub struct Config {
    /// Auxiliary runtime asset copied into place at startup
    pub asset_source: PathBuf,
    pub asset_dest: PathBuf,

    /// Executable each job is handed to. Defaults to the copied asset.
    pub processor_command: PathBuf,

    /// Upstream platform App credentials
    pub github_app_id: Option<u64>,
    pub github_private_key_base64: Option<String>,

    /// Local server and consumer loop
    pub port: u16,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("asset_source", &self.asset_source)
            .field("asset_dest", &self.asset_dest)
            .field("processor_command", &self.processor_command)
            .field("github_app_id", &self.github_app_id)
            .field(
                "github_private_key_base64",
                &self.github_private_key_base64.as_ref().map(|_| "[REDACTED]"),
            )
            .field("port", &self.port)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let asset_source = non_empty("RUNNERQ_ASSET_SOURCE")
            .unwrap_or_else(|| DEFAULT_ASSET_SOURCE.to_string())
            .into();
        let asset_dest: PathBuf = non_empty("RUNNERQ_ASSET_DEST")
            .unwrap_or_else(|| DEFAULT_ASSET_DEST.to_string())
            .into();
        let processor_command = non_empty("RUNNERQ_PROCESSOR_COMMAND")
            .map(PathBuf::from)
            .unwrap_or_else(|| asset_dest.clone());

        let github_app_id = non_empty("GITHUB_APP_ID")
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    ConfigError::Invalid(format!("GITHUB_APP_ID must be numeric, got {v:?}"))
                })
            })
            .transpose()?;
        let github_private_key_base64 = non_empty("GITHUB_PRIVATE_KEY_BASE64");
        if github_app_id.is_some() && github_private_key_base64.is_none() {
            return Err(ConfigError::Missing(
                "GITHUB_PRIVATE_KEY_BASE64 is required when GITHUB_APP_ID is set".to_string(),
            ));
        }

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let poll_interval = env::var("RUNNERQ_POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(1));

        Ok(Self {
            asset_source,
            asset_dest,
            processor_command,
            github_app_id,
            github_private_key_base64,
            port,
            poll_interval,
        })
    }

    /// Settings consumed by process initialization
    pub fn init_config(&self) -> InitConfig {
        InitConfig {
            asset_source: self.asset_source.clone(),
            asset_dest: self.asset_dest.clone(),
            github_app_id: self.github_app_id,
            github_private_key_base64: self.github_private_key_base64.clone(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "RUNNERQ_ASSET_SOURCE",
        "RUNNERQ_ASSET_DEST",
        "RUNNERQ_PROCESSOR_COMMAND",
        "GITHUB_APP_ID",
        "GITHUB_PRIVATE_KEY_BASE64",
        "PORT",
        "RUNNERQ_POLL_INTERVAL_SECONDS",
    ];

    fn clear_env() {
        for key in VARS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.asset_source, PathBuf::from(DEFAULT_ASSET_SOURCE));
        assert_eq!(config.asset_dest, PathBuf::from(DEFAULT_ASSET_DEST));
        assert_eq!(config.processor_command, PathBuf::from(DEFAULT_ASSET_DEST));
        assert_eq!(config.github_app_id, None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    #[serial]
    fn test_app_id_requires_private_key() {
        clear_env();
        env::set_var("GITHUB_APP_ID", "12345");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_non_numeric_app_id_is_invalid() {
        clear_env();
        env::set_var("GITHUB_APP_ID", "my-app");
        env::set_var("GITHUB_PRIVATE_KEY_BASE64", "Zm9v");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_debug_redacts_private_key() {
        clear_env();
        env::set_var("GITHUB_APP_ID", "12345");
        env::set_var("GITHUB_PRIVATE_KEY_BASE64", "c2VjcmV0");
        env::set_var("RUNNERQ_PROCESSOR_COMMAND", "/usr/local/bin/shoes");

        let config = Config::from_env().unwrap();
        assert_eq!(config.github_app_id, Some(12345));
        assert_eq!(config.processor_command, PathBuf::from("/usr/local/bin/shoes"));

        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("c2VjcmV0"));
        clear_env();
    }
}
