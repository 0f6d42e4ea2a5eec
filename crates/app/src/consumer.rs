//! Long-running queue consumer
//!
//! Outside Lambda nothing pushes batches to us, so the consumer polls the
//! job store, hands each job to the processor, and deletes it on success.
//! A job whose processing fails is left in the queue and becomes visible
//! again once its visibility timeout lapses.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use runnerq_jobs::{Datastore, JobStore, StoreError};

use crate::processor::JobProcessor;

/// Counts for one poll
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub received: usize,
    pub processed: usize,
    pub failed: usize,
}

pub struct Consumer {
    datastore: Arc<dyn Datastore>,
    processor: Arc<dyn JobProcessor>,
    idle_delay: Duration,
}

impl Consumer {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        processor: Arc<dyn JobProcessor>,
        idle_delay: Duration,
    ) -> Self {
        Self {
            datastore,
            processor,
            idle_delay,
        }
    }

    /// Poll once and process what was received
    pub async fn run_once(&self) -> Result<PollSummary, StoreError> {
        let jobs = self.datastore.list_jobs().await?;
        let mut summary = PollSummary {
            received: jobs.len(),
            ..PollSummary::default()
        };

        for job in jobs {
            if let Err(e) = self.processor.process(&job).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to process job, leaving it queued");
                summary.failed += 1;
                continue;
            }
            summary.processed += 1;

            if let Err(e) = self.datastore.delete_job(job.id).await {
                tracing::warn!(job_id = %job.id, error = %e, "Processed job could not be deleted");
            }
        }

        Ok(summary)
    }

    /// Poll until `shutdown` resolves. Empty polls and transient store
    /// errors back off by the idle delay; other store errors end the loop.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), StoreError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(idle_delay = ?self.idle_delay, "Consumer started");

        loop {
            let idle = tokio::select! {
                _ = &mut shutdown => break,
                result = self.run_once() => match result {
                    Ok(summary) => summary.received == 0,
                    Err(e) if e.is_transient() => {
                        tracing::warn!(error = %e, "Poll failed, backing off");
                        true
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Consumer stopping on store error");
                        return Err(e);
                    }
                },
            };

            if idle {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(self.idle_delay) => {}
                }
            }
        }

        tracing::info!("Consumer stopped");
        Ok(())
    }
}
