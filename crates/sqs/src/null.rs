//! Null-object datastore for entities a queue cannot hold
//!
//! Target, runner and lock operations succeed without storing anything.
//! Target lookups hand back a default active target so that jobs can still
//! be bound to a pool.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use runnerq_jobs::{
    LockStore, ResourceType, Runner, RunnerStatus, RunnerStore, StoreError, Target, TargetStatus,
    TargetStore,
};

/// Stateless datastore that accepts every write and remembers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDatastore;

impl NullDatastore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl TargetStore for NullDatastore {
    async fn create_target(&self, _target: Target) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_target(&self, id: Uuid) -> Result<Option<Target>, StoreError> {
        tracing::trace!(target_id = %id, "Null datastore: default target");
        Ok(Some(Target::default()))
    }

    async fn get_target_by_scope(&self, scope: &str) -> Result<Option<Target>, StoreError> {
        Ok(Some(Target {
            scope: scope.to_string(),
            ..Target::default()
        }))
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_target(&self, _id: Uuid) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update_target_status(
        &self,
        _target_id: Uuid,
        _new_status: TargetStatus,
        _description: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update_token(
        &self,
        _target_id: Uuid,
        _new_token: &str,
        _new_expired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn update_target_param(
        &self,
        _target_id: Uuid,
        _new_resource_type: ResourceType,
        _new_provider_url: Option<String>,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl RunnerStore for NullDatastore {
    async fn create_runner(&self, _runner: Runner) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_runners(&self) -> Result<Vec<Runner>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_runners_by_target_id(&self, _target_id: Uuid) -> Result<Vec<Runner>, StoreError> {
        Ok(Vec::new())
    }

    async fn get_runner(&self, _id: Uuid) -> Result<Option<Runner>, StoreError> {
        Ok(None)
    }

    async fn delete_runner(
        &self,
        _id: Uuid,
        _deleted_at: DateTime<Utc>,
        _reason: RunnerStatus,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl LockStore for NullDatastore {
    async fn get_lock(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn is_locked(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
