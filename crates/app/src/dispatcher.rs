//! Queue-triggered dispatch
//!
//! Lambda delivers received queue messages in batches. Each record body is
//! decoded with the wire envelope and handed to the job processor. Records
//! that cannot be decoded are dropped with a warning; records whose
//! processing fails are reported back as batch item failures so only they
//! are redelivered.

use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent, SqsMessage};
use futures::future::join_all;
use runnerq_jobs::Job;
use runnerq_sqs::convert_job;

use crate::processor::JobProcessor;

/// Outcome of dispatching one batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub processed: usize,
    pub skipped: usize,
    /// Message ids of records whose processing failed
    pub failed: Vec<String>,
}

impl DispatchSummary {
    /// Partial batch response naming the records to redeliver
    pub fn batch_response(&self) -> SqsBatchResponse {
        SqsBatchResponse {
            batch_item_failures: self
                .failed
                .iter()
                .map(|id| BatchItemFailure {
                    item_identifier: id.clone(),
                })
                .collect(),
        }
    }
}

enum RecordOutcome {
    Processed,
    Skipped,
    Failed(String),
}

fn decode(record: &SqsMessage) -> Option<Job> {
    let message_id = record.message_id.as_deref().unwrap_or("<unknown>");
    let Some(body) = record.body.as_deref() else {
        tracing::warn!(message_id, "Skipping record without body");
        return None;
    };
    match convert_job(body) {
        Ok(job) => Some(job),
        Err(e) => {
            tracing::warn!(message_id, error = %e, "Skipping undecodable record");
            None
        }
    }
}

async fn dispatch_record(processor: &dyn JobProcessor, record: SqsMessage) -> RecordOutcome {
    let Some(job) = decode(&record) else {
        return RecordOutcome::Skipped;
    };

    match processor.process(&job).await {
        Ok(()) => RecordOutcome::Processed,
        Err(e) => {
            tracing::error!(job_id = %job.id, repository = %job.repository, error = %e, "Failed to process job");
            RecordOutcome::Failed(record.message_id.unwrap_or_else(|| job.id.to_string()))
        }
    }
}

/// Process every record of a batch concurrently
pub async fn dispatch(processor: &dyn JobProcessor, event: SqsEvent) -> DispatchSummary {
    let outcomes = join_all(
        event
            .records
            .into_iter()
            .map(|record| dispatch_record(processor, record)),
    )
    .await;

    let mut summary = DispatchSummary::default();
    for outcome in outcomes {
        match outcome {
            RecordOutcome::Processed => summary.processed += 1,
            RecordOutcome::Skipped => summary.skipped += 1,
            RecordOutcome::Failed(id) => summary.failed.push(id),
        }
    }

    tracing::info!(
        processed = summary.processed,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        "Batch dispatched"
    );
    summary
}
