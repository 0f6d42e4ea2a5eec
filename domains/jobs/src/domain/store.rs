//! Datastore capability traits
//!
//! The rest of the system talks to storage through these traits. A full
//! datastore implements all of them; the queue-backed deployment implements
//! `JobStore` for real and satisfies the others with a null object.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{Job, ResourceType, Runner, RunnerStatus, Target, TargetStatus};
use crate::domain::error::StoreError;

/// Job descriptor storage
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a job for later pickup
    async fn enqueue_job(&self, job: Job) -> Result<(), StoreError>;

    /// Return currently pending jobs. An empty result is not an error.
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Remove a job by identity. Implementations may treat an unknown id
    /// as success.
    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Runner-pool configuration storage
#[async_trait::async_trait]
pub trait TargetStore: Send + Sync {
    async fn create_target(&self, target: Target) -> Result<(), StoreError>;

    async fn get_target(&self, id: Uuid) -> Result<Option<Target>, StoreError>;

    /// Look up the target serving a repository or organization
    async fn get_target_by_scope(&self, scope: &str) -> Result<Option<Target>, StoreError>;

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError>;

    async fn delete_target(&self, id: Uuid) -> Result<(), StoreError>;

    async fn update_target_status(
        &self,
        target_id: Uuid,
        new_status: TargetStatus,
        description: &str,
    ) -> Result<(), StoreError>;

    async fn update_token(
        &self,
        target_id: Uuid,
        new_token: &str,
        new_expired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_target_param(
        &self,
        target_id: Uuid,
        new_resource_type: ResourceType,
        new_provider_url: Option<String>,
    ) -> Result<(), StoreError>;
}

/// Runner record storage
#[async_trait::async_trait]
pub trait RunnerStore: Send + Sync {
    async fn create_runner(&self, runner: Runner) -> Result<(), StoreError>;

    async fn list_runners(&self) -> Result<Vec<Runner>, StoreError>;

    async fn list_runners_by_target_id(&self, target_id: Uuid) -> Result<Vec<Runner>, StoreError>;

    async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>, StoreError>;

    async fn delete_runner(
        &self,
        id: Uuid,
        deleted_at: DateTime<Utc>,
        reason: RunnerStatus,
    ) -> Result<(), StoreError>;
}

/// Process-spanning lock
#[async_trait::async_trait]
pub trait LockStore: Send + Sync {
    async fn get_lock(&self) -> Result<(), StoreError>;

    /// Returns the current lock holder, if any
    async fn is_locked(&self) -> Result<Option<String>, StoreError>;
}

/// Full datastore capability surface
pub trait Datastore: JobStore + TargetStore + RunnerStore + LockStore {}

impl<T> Datastore for T where T: JobStore + TargetStore + RunnerStore + LockStore {}
