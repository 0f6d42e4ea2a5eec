//! Datastore error taxonomy

use thiserror::Error;

/// Errors surfaced by datastore implementations.
///
/// None of these are retried internally; the caller decides.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store configuration error: {0}")]
    Configuration(String),

    #[error("Store initialization error: {0}")]
    Initialization(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Poll error: {0}")]
    Poll(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Delete error: {0}")]
    Delete(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl StoreError {
    /// Whether the failure is plausibly transient (network, quota, deadline)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Publish(_)
                | StoreError::Poll(_)
                | StoreError::Delete(_)
                | StoreError::Cancelled(_)
        )
    }
}
