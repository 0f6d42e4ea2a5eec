//! Domain entities for the runner queue
//!
//! A `Job` is a unit of CI work waiting for an ephemeral runner. `Target`
//! and `Runner` describe runner pools and launched runners; in queue-backed
//! deployments they are never persisted, but the types still flow through the
//! datastore capability surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Host of an alternate (enterprise) deployment of the upstream platform.
    /// `None` for the default deployment.
    pub source_domain: Option<String>,
    /// Target repository as `owner/repo`
    pub repository: String,
    /// Original trigger event, passed through unmodified
    pub trigger_payload: String,
    pub target_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job with a fresh id and timestamps
    pub fn new(
        repository: impl Into<String>,
        trigger_payload: impl Into<String>,
        target_id: Uuid,
        source_domain: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            source_domain: normalize_domain(source_domain),
            repository: repository.into(),
            trigger_payload: trigger_payload.into(),
            target_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if job targets the default deployment of the upstream platform
    pub fn is_default_domain(&self) -> bool {
        self.source_domain.is_none()
    }
}

/// Empty and absent domains are equivalent; collapse both to `None`.
pub fn normalize_domain(domain: Option<String>) -> Option<String> {
    domain.filter(|d| !d.is_empty())
}

/// Runner size class requested by a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResourceType {
    #[default]
    #[serde(rename = "nano")]
    Nano,
    #[serde(rename = "micro")]
    Micro,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large")]
    Large,
    #[serde(rename = "xlarge")]
    XLarge,
    #[serde(rename = "2xlarge")]
    XLarge2,
    #[serde(rename = "3xlarge")]
    XLarge3,
    #[serde(rename = "4xlarge")]
    XLarge4,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceType::Nano => "nano",
            ResourceType::Micro => "micro",
            ResourceType::Small => "small",
            ResourceType::Medium => "medium",
            ResourceType::Large => "large",
            ResourceType::XLarge => "xlarge",
            ResourceType::XLarge2 => "2xlarge",
            ResourceType::XLarge3 => "3xlarge",
            ResourceType::XLarge4 => "4xlarge",
        };
        write!(f, "{}", s)
    }
}

/// Target status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    #[default]
    Active,
    Running,
    Suspend,
    Deleted,
    Error,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Active => write!(f, "active"),
            TargetStatus::Running => write!(f, "running"),
            TargetStatus::Suspend => write!(f, "suspend"),
            TargetStatus::Deleted => write!(f, "deleted"),
            TargetStatus::Error => write!(f, "error"),
        }
    }
}

/// Runner-pool configuration a job is dispatched against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    /// Repository (`owner/repo`) or organization the pool serves
    pub scope: String,
    pub resource_type: ResourceType,
    pub status: TargetStatus,
    pub status_description: Option<String>,
    pub provider_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Target {
    fn default() -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id: Uuid::nil(),
            scope: String::new(),
            resource_type: ResourceType::default(),
            status: TargetStatus::default(),
            status_description: None,
            provider_url: None,
            created_at: epoch,
            updated_at: epoch,
        }
    }
}

impl Target {
    /// Check if the target accepts new jobs
    pub fn is_active(&self) -> bool {
        matches!(self.status, TargetStatus::Active | TargetStatus::Running)
    }
}

/// Reason a runner was retired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerStatus {
    Created,
    Completed,
    ReachHardLimit,
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerStatus::Created => write!(f, "created"),
            RunnerStatus::Completed => write!(f, "completed"),
            RunnerStatus::ReachHardLimit => write!(f, "reach_hard_limit"),
        }
    }
}

/// Ephemeral runner launched for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub id: Uuid,
    pub shoes_type: String,
    pub ip_address: String,
    pub target_id: Uuid,
    pub cloud_id: String,
    pub status: RunnerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_new_assigns_identity_and_timestamps() {
        let target_id = Uuid::new_v4();
        let job = Job::new("acme/app", "{}", target_id, None);

        assert_ne!(job.id, Uuid::nil());
        assert_eq!(job.repository, "acme/app");
        assert_eq!(job.trigger_payload, "{}");
        assert_eq!(job.target_id, target_id);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.is_default_domain());
    }

    #[test]
    fn test_job_new_normalizes_empty_domain() {
        let job = Job::new("acme/app", "{}", Uuid::nil(), Some(String::new()));
        assert_eq!(job.source_domain, None);

        let job = Job::new("acme/app", "{}", Uuid::nil(), Some("ghe.example.com".into()));
        assert_eq!(job.source_domain.as_deref(), Some("ghe.example.com"));
        assert!(!job.is_default_domain());
    }

    #[test]
    fn test_resource_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ResourceType::XLarge2).unwrap(),
            "\"2xlarge\""
        );
        assert_eq!(
            serde_json::from_str::<ResourceType>("\"nano\"").unwrap(),
            ResourceType::Nano
        );
        assert_eq!(ResourceType::XLarge4.to_string(), "4xlarge");
    }

    #[test]
    fn test_default_target_is_active_nano() {
        let target = Target::default();
        assert_eq!(target.id, Uuid::nil());
        assert_eq!(target.resource_type, ResourceType::Nano);
        assert_eq!(target.status, TargetStatus::Active);
        assert!(target.is_active());
    }

    #[test]
    fn test_suspended_target_is_not_active() {
        let target = Target {
            status: TargetStatus::Suspend,
            ..Target::default()
        };
        assert!(!target.is_active());
    }

    #[test]
    fn test_runner_status_display() {
        assert_eq!(RunnerStatus::ReachHardLimit.to_string(), "reach_hard_limit");
        assert_eq!(
            serde_json::to_string(&RunnerStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
