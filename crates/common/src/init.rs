//! One-shot process initialization
//!
//! Copies the auxiliary runtime asset into a writable location and builds
//! the upstream credential cache. `initialize` runs the work once per
//! process; every later call returns the same `Runtime`. `Runtime::teardown`
//! undoes the filesystem side effects.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

use crate::error::InitError;
use crate::github::GitHubAppCredentials;

static RUNTIME: OnceCell<Runtime> = OnceCell::const_new();

/// Inputs to process initialization
#[derive(Clone, Default)]
pub struct InitConfig {
    pub asset_source: PathBuf,
    pub asset_dest: PathBuf,
    pub github_app_id: Option<u64>,
    pub github_private_key_base64: Option<String>,
}

/// Initialized process state
#[derive(Debug)]
pub struct Runtime {
    asset_path: Option<PathBuf>,
    credentials: Option<GitHubAppCredentials>,
}

/// Initialize the process once. Concurrent callers wait for the first
/// initialization; a failed initialization is retried by the next caller.
pub async fn initialize(config: &InitConfig) -> Result<&'static Runtime, InitError> {
    RUNTIME.get_or_try_init(|| Runtime::build(config)).await
}

impl Runtime {
    /// Run initialization without registering it process-wide
    pub async fn build(config: &InitConfig) -> Result<Self, InitError> {
        let asset_path = copy_asset(&config.asset_source, &config.asset_dest).await?;

        let credentials = match (config.github_app_id, &config.github_private_key_base64) {
            (Some(app_id), Some(key)) => {
                let creds = GitHubAppCredentials::from_base64_pem(app_id, key)?;
                tracing::info!(app_id, "GitHub App credentials cached");
                Some(creds)
            }
            (Some(_), None) => {
                return Err(InitError::Credentials(
                    "App id configured without a private key".to_string(),
                ))
            }
            _ => {
                tracing::warn!("No GitHub App configured, credential cache disabled");
                None
            }
        };

        Ok(Self {
            asset_path,
            credentials,
        })
    }

    /// Location of the copied asset, if one was copied
    pub fn asset_path(&self) -> Option<&Path> {
        self.asset_path.as_deref()
    }

    pub fn credentials(&self) -> Option<&GitHubAppCredentials> {
        self.credentials.as_ref()
    }

    /// Remove the copied asset. Safe to call more than once.
    pub async fn teardown(&self) -> Result<(), InitError> {
        let Some(path) = self.asset_path.clone() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || remove_path(&path))
            .await
            .map_err(|e| InitError::Asset(format!("teardown task failed: {}", e)))?
    }
}

async fn copy_asset(source: &Path, dest: &Path) -> Result<Option<PathBuf>, InitError> {
    if source.as_os_str().is_empty() || !tokio::fs::try_exists(source).await.unwrap_or(false) {
        tracing::warn!(source = %source.display(), "Runtime asset not found, skipping copy");
        return Ok(None);
    }

    let (source, dest) = (source.to_path_buf(), dest.to_path_buf());
    let copied = dest.clone();
    tokio::task::spawn_blocking(move || copy_recursively(&source, &dest))
        .await
        .map_err(|e| InitError::Asset(format!("copy task failed: {}", e)))??;

    tracing::info!(dest = %copied.display(), "Runtime asset copied");
    Ok(Some(copied))
}

fn copy_recursively(source: &Path, dest: &Path) -> Result<(), InitError> {
    let io_err = |action: &str, path: &Path, e: std::io::Error| {
        InitError::Asset(format!("failed to {} {}: {}", action, path.display(), e))
    };

    let metadata = std::fs::metadata(source).map_err(|e| io_err("stat", source, e))?;
    if metadata.is_dir() {
        std::fs::create_dir_all(dest).map_err(|e| io_err("create", dest, e))?;
        for entry in std::fs::read_dir(source).map_err(|e| io_err("read", source, e))? {
            let entry = entry.map_err(|e| io_err("read", source, e))?;
            copy_recursively(&entry.path(), &dest.join(entry.file_name()))?;
        }
        std::fs::set_permissions(dest, metadata.permissions())
            .map_err(|e| io_err("chmod", dest, e))?;
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err("create", parent, e))?;
        }
        // fs::copy carries permission bits over
        std::fs::copy(source, dest).map_err(|e| io_err("copy", source, e))?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<(), InitError> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| InitError::Asset(format!("failed to remove {}: {}", path.display(), e)))
}
