//! Shared configuration, process initialization and credentials for Runnerq
//!
//! This crate provides common functionality used across the Runnerq binaries:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - One-shot process initialization with explicit teardown
//! - Upstream platform (GitHub App) credential cache

pub mod config;
pub mod error;
pub mod github;
pub mod init;

pub use config::Config;
pub use error::{ConfigError, InitError};
pub use github::GitHubAppCredentials;
pub use init::{initialize, InitConfig, Runtime};
