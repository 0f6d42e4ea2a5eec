//! Job store over an at-least-once queue
//!
//! Jobs are published with their id as the deduplication key and a constant
//! group key. Listing never deletes; consumers delete by id once a job is
//! handled. Because the queue addresses messages by delivery handle, delete
//! by id scans a single received batch for the matching job:
//!
//! - a job outside the currently visible batch is reported as not found,
//!   even if it is still queued;
//! - scanned messages that did not match stay hidden from other receivers
//!   until their visibility timeout lapses.

use std::future::Future;
use std::time::Duration;

use uuid::Uuid;

use runnerq_jobs::{Job, JobStore};

use crate::aws_sqs::SqsTransport;
use crate::envelope::{convert_job, JobEnvelope};
use crate::transport::{OutboundMessage, QueueTransport};
use crate::{QueueConfig, StoreError};

/// Result of a delete-by-id attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The matching message was removed
    Deleted,
    /// No message in the scanned batch carried the id
    NotFound,
}

/// Queue-backed job store
#[derive(Debug, Clone)]
pub struct SqsJobStore<T = SqsTransport> {
    transport: T,
    message_group_id: String,
    max_messages: i32,
    wait_time_seconds: i32,
}

impl SqsJobStore<SqsTransport> {
    /// Validate config, build the SQS client and probe the queue
    pub async fn connect(config: QueueConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let transport = SqsTransport::new(&config).await?;
        transport.probe().await;

        tracing::info!(
            queue_url = %config.queue_url,
            region = %config.region,
            "Queue job store ready"
        );

        Ok(Self::with_transport(transport, &config))
    }
}

impl<T: QueueTransport> SqsJobStore<T> {
    /// Create a store over an already-built transport
    pub fn with_transport(transport: T, config: &QueueConfig) -> Self {
        Self {
            transport,
            message_group_id: config.message_group_id.clone(),
            max_messages: config.max_messages,
            wait_time_seconds: config.wait_time_seconds,
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Delete a job by id, reporting whether it was found in the scanned
    /// batch. Only one batch is scanned per call.
    pub async fn delete_job_by_id(&self, id: Uuid) -> Result<DeleteOutcome, StoreError> {
        let messages = self
            .transport
            .receive(self.max_messages, self.wait_time_seconds)
            .await?;

        for message in &messages {
            let envelope = JobEnvelope::from_body(&message.body)?;
            if envelope.uuid != id {
                continue;
            }

            self.transport.delete(&message.receipt_handle).await?;
            tracing::debug!(job_id = %id, "Job deleted from queue");
            return Ok(DeleteOutcome::Deleted);
        }

        tracing::warn!(
            job_id = %id,
            scanned = messages.len(),
            "failed to delete job: not found"
        );
        Ok(DeleteOutcome::NotFound)
    }
}

#[async_trait::async_trait]
impl<T: QueueTransport> JobStore for SqsJobStore<T> {
    async fn enqueue_job(&self, job: Job) -> Result<(), StoreError> {
        let body = JobEnvelope::from(&job).to_body()?;

        self.transport
            .send(OutboundMessage {
                body,
                group_id: self.message_group_id.clone(),
                deduplication_id: job.id.to_string(),
            })
            .await?;

        tracing::info!(job_id = %job.id, repository = %job.repository, "Job enqueued");
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let messages = self
            .transport
            .receive(self.max_messages, self.wait_time_seconds)
            .await?;

        let jobs = messages
            .iter()
            .map(|m| convert_job(&m.body))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = jobs.len(), "Jobs listed from queue");
        Ok(jobs)
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete_job_by_id(id).await.map(|_| ())
    }
}

/// Run a store operation under a deadline. An elapsed deadline drops the
/// in-flight request and surfaces as `StoreError::Cancelled`.
pub async fn with_deadline<F, R>(deadline: Duration, operation: &str, fut: F) -> Result<R, StoreError>
where
    F: Future<Output = Result<R, StoreError>>,
{
    tokio::time::timeout(deadline, fut).await.map_err(|_| {
        StoreError::Cancelled(format!("{}: deadline of {:?} elapsed", operation, deadline))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockQueueTransport;
    use crate::transport::ReceivedMessage;
    use std::sync::Arc;

    fn store() -> SqsJobStore<MockQueueTransport> {
        let config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        SqsJobStore::with_transport(MockQueueTransport::new(), &config)
    }

    fn job_a() -> Job {
        let mut job = Job::new("acme/app", r#"{"action":"created"}"#, Uuid::new_v4(), None);
        job.id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        job
    }

    #[tokio::test]
    async fn test_enqueue_uses_job_id_as_dedup_key_and_constant_group() {
        let store = store();
        let first = job_a();
        let second = Job::new("acme/other", "{}", Uuid::new_v4(), None);

        store.enqueue_job(first.clone()).await.unwrap();
        store.enqueue_job(second.clone()).await.unwrap();

        let sent = store.transport().sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].deduplication_id, first.id.to_string());
        assert_eq!(sent[1].deduplication_id, second.id.to_string());
        assert!(sent.iter().all(|m| m.group_id == "runnerq"));
    }

    #[tokio::test]
    async fn test_enqueue_same_id_twice_yields_one_message() {
        let store = store();
        let job = job_a();

        store.enqueue_job(job.clone()).await.unwrap();
        store.enqueue_job(job.clone()).await.unwrap();

        assert_eq!(store.transport().depth(), 1);
        assert_eq!(store.list_jobs().await.unwrap(), vec![job]);
    }

    #[tokio::test]
    async fn test_enqueue_transport_failure_is_publish_error() {
        let store = store();
        store.transport().fail_next_send("AccessDenied");

        let err = store.enqueue_job(job_a()).await.unwrap_err();
        assert!(matches!(err, StoreError::Publish(_)));
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(store.transport().depth(), 0);
    }

    #[tokio::test]
    async fn test_list_on_empty_queue_is_empty() {
        let store = store();
        assert!(store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_does_not_delete() {
        let store = store();
        store.enqueue_job(job_a()).await.unwrap();

        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
        assert_eq!(store.transport().depth(), 1);
        assert_eq!(store.transport().deleted_count(), 0);
    }

    #[tokio::test]
    async fn test_list_aborts_on_malformed_message() {
        let store = store();
        store.enqueue_job(job_a()).await.unwrap();
        store.transport().push_raw("{not json");

        let err = store.list_jobs().await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_list_poll_failure_is_poll_error() {
        let store = store();
        store.transport().fail_next_receive("connection reset");

        assert!(matches!(
            store.list_jobs().await,
            Err(StoreError::Poll(_))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_enqueue_list_delete_scenario() {
        let config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        let transport = MockQueueTransport::with_timings(Duration::ZERO, Duration::from_secs(300));
        let store = SqsJobStore::with_transport(transport, &config);
        let target_id = Uuid::new_v4();
        let mut job = job_a();
        job.target_id = target_id;

        store.enqueue_job(job.clone()).await.unwrap();

        let listed = store.list_jobs().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, job.id);
        assert_eq!(listed[0].repository, "acme/app");
        assert_eq!(listed[0].target_id, target_id);

        assert_eq!(
            store.delete_job_by_id(job.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(store.list_jobs().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_unknown_id_is_success_without_side_effect() {
        let config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        let transport = MockQueueTransport::with_timings(Duration::ZERO, Duration::from_secs(300));
        let store = SqsJobStore::with_transport(transport, &config);
        store.enqueue_job(job_a()).await.unwrap();

        let outcome = store.delete_job_by_id(Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        store.delete_job(Uuid::new_v4()).await.unwrap();

        assert_eq!(store.transport().depth(), 1);
        assert_eq!(store.transport().deleted_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_only_matching_message() {
        let store = store();
        let keep = Job::new("acme/keep", "{}", Uuid::new_v4(), None);
        let drop = job_a();
        store.enqueue_job(keep.clone()).await.unwrap();
        store.enqueue_job(drop.clone()).await.unwrap();

        store.delete_job(drop.id).await.unwrap();

        assert_eq!(store.transport().depth(), 1);
        store.transport().expire_visibility();
        assert_eq!(store.list_jobs().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn test_delete_scans_a_single_batch() {
        let mut config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        config.max_messages = 2;
        let store = SqsJobStore::with_transport(MockQueueTransport::new(), &config);

        let jobs: Vec<Job> = (0..3)
            .map(|i| Job::new(format!("acme/app-{i}"), "{}", Uuid::new_v4(), None))
            .collect();
        for job in &jobs {
            store.enqueue_job(job.clone()).await.unwrap();
        }

        // The third job is outside the first batch
        let outcome = store.delete_job_by_id(jobs[2].id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        assert_eq!(store.transport().depth(), 3);
        assert_eq!(store.transport().receive_calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_aborts_on_malformed_message() {
        let store = store();
        store.transport().push_raw("garbage");
        store.enqueue_job(job_a()).await.unwrap();

        let err = store.delete_job(job_a().id).await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialization(_)));
        assert_eq!(store.transport().depth(), 2);
    }

    #[tokio::test]
    async fn test_delete_transport_failure_is_delete_error() {
        let store = store();
        store.enqueue_job(job_a()).await.unwrap();
        store.transport().fail_next_delete("InvalidReceiptHandle");

        assert!(matches!(
            store.delete_job(job_a().id).await,
            Err(StoreError::Delete(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_with_distinct_ids_are_all_listed() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let job = Job::new(format!("acme/app-{i}"), "{}", Uuid::new_v4(), None);
                    store.enqueue_job(job.clone()).await.map(|_| job.id)
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }

        let mut listed: Vec<Uuid> = store.list_jobs().await.unwrap().iter().map(|j| j.id).collect();
        listed.sort();
        ids.sort();
        assert_eq!(listed, ids);
    }

    struct StalledTransport;

    #[async_trait::async_trait]
    impl QueueTransport for StalledTransport {
        async fn send(&self, _message: OutboundMessage) -> Result<(), StoreError> {
            Ok(())
        }

        async fn receive(&self, _max: i32, _wait: i32) -> Result<Vec<ReceivedMessage>, StoreError> {
            std::future::pending().await
        }

        async fn delete(&self, _receipt_handle: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deadline_cancels_in_flight_poll() {
        let config = QueueConfig::new("https://sqs.local/jobs.fifo", "us-east-1");
        let store = SqsJobStore::with_transport(StalledTransport, &config);

        let err = with_deadline(Duration::from_millis(50), "list_jobs", store.list_jobs())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cancelled(_)));
        assert!(err.to_string().contains("list_jobs"));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let store = store();
        store.enqueue_job(job_a()).await.unwrap();

        let jobs = with_deadline(Duration::from_secs(5), "list_jobs", store.list_jobs())
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
    }
}
