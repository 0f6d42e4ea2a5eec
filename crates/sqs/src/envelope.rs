//! JSON wire envelope for jobs crossing the queue boundary
//!
//! Field names are shared with every other producer and consumer of the
//! queue and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use runnerq_jobs::{normalize_domain, Job, StoreError};

/// Job as it appears in a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub uuid: Uuid,
    /// Empty string when the job targets the default deployment. Missing
    /// and `null` both decode as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ghe_domain: String,
    pub repository: String,
    pub check_event: String,
    pub target_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobEnvelope {
    /// Serialize to a message body
    pub fn to_body(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| {
            StoreError::Publish(format!("failed to encode job {}: {}", self.uuid, e))
        })
    }

    /// Parse a message body
    pub fn from_body(body: &str) -> Result<Self, StoreError> {
        serde_json::from_str(body)
            .map_err(|e| StoreError::Deserialization(format!("failed to decode job: {}", e)))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<&Job> for JobEnvelope {
    fn from(job: &Job) -> Self {
        Self {
            uuid: job.id,
            ghe_domain: job.source_domain.clone().unwrap_or_default(),
            repository: job.repository.clone(),
            check_event: job.trigger_payload.clone(),
            target_id: job.target_id,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

impl From<JobEnvelope> for Job {
    fn from(envelope: JobEnvelope) -> Self {
        Job {
            id: envelope.uuid,
            source_domain: normalize_domain(Some(envelope.ghe_domain)),
            repository: envelope.repository,
            trigger_payload: envelope.check_event,
            target_id: envelope.target_id,
            created_at: envelope.created_at,
            updated_at: envelope.updated_at,
        }
    }
}

/// Decode a message body straight into a domain job
pub fn convert_job(body: &str) -> Result<Job, StoreError> {
    JobEnvelope::from_body(body).map(Job::from)
}
