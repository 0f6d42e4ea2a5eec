//! Queue-backed datastore composition
//!
//! Pairs a real `JobStore` with `NullDatastore` so the whole capability
//! surface is satisfied while only jobs are actually stored.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use runnerq_jobs::{
    Job, JobStore, LockStore, ResourceType, Runner, RunnerStatus, RunnerStore, StoreError, Target,
    TargetStatus, TargetStore,
};

use crate::null::NullDatastore;
use crate::store::SqsJobStore;
use crate::QueueConfig;

/// Datastore that keeps jobs in a queue and nothing else
#[derive(Debug, Clone)]
pub struct QueueDatastore<J = SqsJobStore> {
    jobs: J,
    entities: NullDatastore,
}

impl QueueDatastore<SqsJobStore> {
    /// Connect a queue-backed datastore to SQS
    pub async fn connect(config: QueueConfig) -> Result<Self, StoreError> {
        Ok(Self::new(SqsJobStore::connect(config).await?))
    }
}

impl<J: JobStore> QueueDatastore<J> {
    pub fn new(jobs: J) -> Self {
        Self {
            jobs,
            entities: NullDatastore::new(),
        }
    }

    /// The job store doing the real work
    pub fn jobs(&self) -> &J {
        &self.jobs
    }
}

#[async_trait::async_trait]
impl<J: JobStore> JobStore for QueueDatastore<J> {
    async fn enqueue_job(&self, job: Job) -> Result<(), StoreError> {
        self.jobs.enqueue_job(job).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.jobs.list_jobs().await
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        self.jobs.delete_job(id).await
    }
}

#[async_trait::async_trait]
impl<J: JobStore> TargetStore for QueueDatastore<J> {
    async fn create_target(&self, target: Target) -> Result<(), StoreError> {
        self.entities.create_target(target).await
    }

    async fn get_target(&self, id: Uuid) -> Result<Option<Target>, StoreError> {
        self.entities.get_target(id).await
    }

    async fn get_target_by_scope(&self, scope: &str) -> Result<Option<Target>, StoreError> {
        self.entities.get_target_by_scope(scope).await
    }

    async fn list_targets(&self) -> Result<Vec<Target>, StoreError> {
        self.entities.list_targets().await
    }

    async fn delete_target(&self, id: Uuid) -> Result<(), StoreError> {
        self.entities.delete_target(id).await
    }

    async fn update_target_status(
        &self,
        target_id: Uuid,
        new_status: TargetStatus,
        description: &str,
    ) -> Result<(), StoreError> {
        self.entities
            .update_target_status(target_id, new_status, description)
            .await
    }

    async fn update_token(
        &self,
        target_id: Uuid,
        new_token: &str,
        new_expired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.entities
            .update_token(target_id, new_token, new_expired_at)
            .await
    }

    async fn update_target_param(
        &self,
        target_id: Uuid,
        new_resource_type: ResourceType,
        new_provider_url: Option<String>,
    ) -> Result<(), StoreError> {
        self.entities
            .update_target_param(target_id, new_resource_type, new_provider_url)
            .await
    }
}

#[async_trait::async_trait]
impl<J: JobStore> RunnerStore for QueueDatastore<J> {
    async fn create_runner(&self, runner: Runner) -> Result<(), StoreError> {
        self.entities.create_runner(runner).await
    }

    async fn list_runners(&self) -> Result<Vec<Runner>, StoreError> {
        self.entities.list_runners().await
    }

    async fn list_runners_by_target_id(&self, target_id: Uuid) -> Result<Vec<Runner>, StoreError> {
        self.entities.list_runners_by_target_id(target_id).await
    }

    async fn get_runner(&self, id: Uuid) -> Result<Option<Runner>, StoreError> {
        self.entities.get_runner(id).await
    }

    async fn delete_runner(
        &self,
        id: Uuid,
        deleted_at: DateTime<Utc>,
        reason: RunnerStatus,
    ) -> Result<(), StoreError> {
        self.entities.delete_runner(id, deleted_at, reason).await
    }
}

#[async_trait::async_trait]
impl<J: JobStore> LockStore for QueueDatastore<J> {
    async fn get_lock(&self) -> Result<(), StoreError> {
        self.entities.get_lock().await
    }

    async fn is_locked(&self) -> Result<Option<String>, StoreError> {
        self.entities.is_locked().await
    }
}
