//! Runnerq Queue-backed Job Store
//!
//! Stores job descriptors in a managed message queue instead of a relational
//! datastore:
//! - AWS SQS (FIFO) transport for production, LocalStack for local testing
//! - In-memory mock transport for tests
//! - JSON wire envelope shared with other producers and consumers of the queue
//! - Null-object datastore for the entity types a queue cannot hold

pub mod aws_sqs;
pub mod datastore;
pub mod envelope;
pub mod mock;
pub mod null;
pub mod store;
pub mod transport;

pub use datastore::QueueDatastore;
pub use envelope::{convert_job, JobEnvelope};
pub use null::NullDatastore;
pub use runnerq_jobs::StoreError;
pub use store::{with_deadline, DeleteOutcome, SqsJobStore};
pub use transport::{OutboundMessage, QueueTransport, ReceivedMessage};

/// Group key applied to every message unless overridden
pub const DEFAULT_MESSAGE_GROUP_ID: &str = "runnerq";

/// Upper bound SQS places on a single receive
pub const MAX_BATCH_SIZE: i32 = 10;

/// Upper bound SQS places on a long-poll wait
pub const MAX_WAIT_TIME_SECONDS: i32 = 20;

/// Queue store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Queue endpoint address
    pub queue_url: String,
    /// AWS region hosting the queue
    pub region: String,
    /// AWS endpoint URL (for LocalStack)
    pub endpoint_url: Option<String>,
    /// Constant partition tag for every enqueued message
    pub message_group_id: String,
    /// Messages fetched per receive, 1..=10
    pub max_messages: i32,
    /// Long-poll wait per receive, 0..=20 seconds
    pub wait_time_seconds: i32,
}

impl QueueConfig {
    /// Create a config with default polling parameters
    pub fn new(queue_url: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            region: region.into(),
            endpoint_url: None,
            message_group_id: DEFAULT_MESSAGE_GROUP_ID.to_string(),
            max_messages: MAX_BATCH_SIZE,
            wait_time_seconds: 10,
        }
    }

    /// Create queue config from environment variables
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok();

        let queue_url = first_non_empty(&["AWS_SQS_QUEUE_URL", "QUEUE_URL"]).ok_or_else(|| {
            StoreError::Configuration("AWS_SQS_QUEUE_URL must be set".to_string())
        })?;

        let region = first_non_empty(&["AWS_REGION", "QUEUE_REGION"])
            .ok_or_else(|| StoreError::Configuration("AWS_REGION must be set".to_string()))?;

        let endpoint_url = first_non_empty(&["AWS_ENDPOINT_URL"]);

        let message_group_id = first_non_empty(&["SQS_MESSAGE_GROUP_ID"])
            .unwrap_or_else(|| DEFAULT_MESSAGE_GROUP_ID.to_string());

        let max_messages = std::env::var("SQS_MAX_MESSAGES")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(MAX_BATCH_SIZE)
            .clamp(1, MAX_BATCH_SIZE);

        let wait_time_seconds = std::env::var("SQS_WAIT_TIME_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(10)
            .clamp(0, MAX_WAIT_TIME_SECONDS);

        let config = Self {
            queue_url,
            region,
            endpoint_url,
            message_group_id,
            max_messages,
            wait_time_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that cannot address a queue
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.queue_url.trim().is_empty() {
            return Err(StoreError::Configuration(
                "queue URL must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(StoreError::Configuration(
                "queue region must not be empty".to_string(),
            ));
        }
        if self.message_group_id.is_empty() {
            return Err(StoreError::Configuration(
                "message group id must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.max_messages) {
            return Err(StoreError::Configuration(format!(
                "max messages must be within 1..={}, got {}",
                MAX_BATCH_SIZE, self.max_messages
            )));
        }
        if !(0..=MAX_WAIT_TIME_SECONDS).contains(&self.wait_time_seconds) {
            return Err(StoreError::Configuration(format!(
                "wait time must be within 0..={} seconds, got {}",
                MAX_WAIT_TIME_SECONDS, self.wait_time_seconds
            )));
        }
        Ok(())
    }
}

fn first_non_empty(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}
